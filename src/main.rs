use anyhow::Result;
use clap::{Parser, Subcommand};
use resized_images_provisioner::app::App;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "resized-images-provisioner")]
#[command(about = "Provision the resized images bucket")]
struct CliArgs {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Render the declaration as a template without applying it.
    Synth {
        /// Write the template here instead of stdout.
        #[arg(long, value_name = "PATH")]
        out: Option<PathBuf>,
    },
    /// Create or update the bucket and publish its exports.
    Deploy,
    /// Delete the bucket with all its objects and withdraw its exports.
    Destroy,
}

async fn run(app: &App, command: Command) -> resized_images_provisioner::Result<()> {
    match command {
        Command::Synth { out } => {
            let rendered = app.synth().await?;
            match out {
                Some(path) => {
                    tokio::fs::write(&path, rendered).await?;
                    info!("Wrote template to {}", path.display());
                }
                None => println!("{}", rendered),
            }
        }
        Command::Deploy => {
            app.deploy().await?;
        }
        Command::Destroy => app.destroy().await?,
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "resized_images_provisioner=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = CliArgs::parse();
    info!("Starting resized-images-provisioner ({:?})", args.command);

    match App::new().await {
        Ok(app) => match run(&app, args.command).await {
            Ok(_) => {
                info!("Provisioning run completed successfully");
                Ok(())
            }
            Err(e) => {
                error!("Provisioning run failed: {}", e);
                std::process::exit(1);
            }
        },
        Err(e) => {
            error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    }
}
