use clap::Parser;
use tracing::warn;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use skinshelf::app::AppContext;
use skinshelf::cli::commands::{self, CrawlOptions};
use skinshelf::cli::{Cli, Commands};
use skinshelf::config::Config;
use skinshelf::pipeline::AbortSignal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;
    let ctx = AppContext::new(config)?;

    match cli.command {
        Commands::Crawl {
            url,
            mode,
            concurrency,
            json,
        } => {
            let abort = AbortSignal::new();
            watch_for_shutdown(abort.clone());

            let options = CrawlOptions {
                url,
                mode,
                concurrency,
                json,
            };
            let summary = commands::crawl(&ctx, options, abort).await?;
            if summary.incomplete {
                std::process::exit(2);
            }
        }
        Commands::List { skin_type } => {
            commands::list_records(&ctx, skin_type)?;
        }
        Commands::Query {
            skin_type,
            max_price,
            benefit,
            name,
            limit,
        } => {
            let query = commands::build_query(skin_type, max_price, benefit, name, limit);
            commands::query_records(&ctx, &query)?;
        }
    }

    Ok(())
}

/// Trip `abort` on SIGINT or SIGTERM so the run stops after the current record.
fn watch_for_shutdown(abort: AbortSignal) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        tokio::spawn(async move {
            let (mut sigterm, mut sigint) =
                match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                    (Ok(term), Ok(int)) => (term, int),
                    (Err(e), _) | (_, Err(e)) => {
                        warn!(error = %e, "Failed to install signal handlers");
                        return;
                    }
                };

            tokio::select! {
                _ = sigterm.recv() => {},
                _ = sigint.recv() => {},
            }
            warn!("Shutdown requested, stopping after the current record");
            abort.abort();
        });
    }

    #[cfg(windows)]
    {
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            abort.abort();
        });
    }
}
