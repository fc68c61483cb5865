use clap::Parser;
use manga_notify::config::Config;
use manga_notify::http_client::FetchClient;
use manga_notify::library::Library;
use manga_notify::models::fmt_chapter;
use manga_notify::notify::Notifier;
use manga_notify::runner::{self, RunOptions};
use manga_notify::sources::LiveSources;
use std::path::PathBuf;
use std::process::ExitCode;

/// Checks manga sites for new chapters and notifies a Discord webhook.
///
/// Without flags this is a dry check: detect and notify, persist
/// nothing. A scheduler is expected to serialize invocations; nothing
/// here guards against two runs writing the library at once.
#[derive(Debug, Parser)]
#[command(name = "manga-notify", version)]
struct Args {
    /// Commit updated baselines to the library after the run.
    #[arg(long)]
    save: bool,

    /// Clean implausible baselines (years, scraped IDs) and exit.
    #[arg(long)]
    fix: bool,

    /// With --fix: report what would change without writing.
    #[arg(long)]
    dry_run: bool,

    /// Library file path (default from config.toml or manga_library.yml).
    #[arg(long)]
    library: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();
    let cfg = Config::load();

    let library_path = args
        .library
        .clone()
        .unwrap_or_else(|| PathBuf::from(&cfg.library_file));

    match run(args, cfg, library_path).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::from(2)
        }
    }
}

async fn run(
    args: Args,
    cfg: Config,
    library_path: PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut library = Library::load(&library_path)?;

    if args.fix {
        return fix_library(&mut library, &library_path, args.dry_run);
    }

    if library.series.is_empty() {
        log::warn!("No series in {}", library_path.display());
        return Ok(());
    }

    let client = FetchClient::new(cfg.fetch_config())?;
    let sources = LiveSources::new(client);
    let opts = RunOptions {
        save: args.save,
        pace_ms: cfg.pace_ms(),
    };

    log::info!(
        "Checking {} series ({})",
        library.series.len(),
        if args.save { "save" } else { "dry check" }
    );
    let report = runner::run(&sources, &library.series, &opts).await;

    for err in &report.errors {
        log::warn!("{}: {}", err.name, err.error);
    }

    if report.events.is_empty() {
        log::info!("Sin novedades.");
    } else {
        let avatar = (!cfg.notify.avatar_url.is_empty()).then_some(cfg.notify.avatar_url.as_str());
        let notifier = Notifier::from_env(&cfg.notify.username, avatar);
        // Delivery failure must not block baseline persistence.
        if let Err(e) = notifier.send_batch(&report.events, &report.errors).await {
            log::error!("Notification failed: {}", e);
        }
    }

    if args.save && !report.updated_baselines.is_empty() {
        library.apply_baselines(&report.updated_baselines);
        if cfg.self_heal_baselines {
            for entry in library.sanitize() {
                log::warn!(
                    "Self-heal: {} baseline {} -> {:?}",
                    entry.name,
                    fmt_chapter(entry.old),
                    entry.new.map(fmt_chapter)
                );
            }
        }
        library.save(&library_path)?;
        log::info!(
            "Committed {} baselines to {}",
            report.updated_baselines.len(),
            library_path.display()
        );
    }

    Ok(())
}

fn fix_library(
    library: &mut Library,
    path: &PathBuf,
    dry_run: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let touched = library.sanitize();
    if touched.is_empty() {
        println!("Nada que limpiar.");
        return Ok(());
    }
    println!("Cambios:");
    for entry in &touched {
        match entry.new {
            Some(v) => println!(
                " - {}: {} -> {} (normalizado)",
                entry.name,
                fmt_chapter(entry.old),
                fmt_chapter(v)
            ),
            None => println!(
                " - {}: {} -> null (inválido)",
                entry.name,
                fmt_chapter(entry.old)
            ),
        }
    }
    if dry_run {
        println!("(Ejecución en seco; no se modificó el archivo)");
        return Ok(());
    }
    library.save(path)?;
    println!("Listo. Backup en: {}.bak", path.display());
    Ok(())
}
