//! certgen - certificate generation from DOCX templates
//!
//! Reads settings from `<data-dir>/settings.json` and records templates,
//! datasets, jobs and generated files under `<data-dir>/store/`.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Command};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    tracing::info!("Starting certgen v{}", env!("CARGO_PKG_VERSION"));
    tracing::debug!("Data directory: {:?}", cli.data_dir);

    match cli.command {
        Command::Placeholders { template } => commands::placeholders(&template),
        Command::Render {
            template,
            values,
            pairs,
            qr_image,
            out,
        } => {
            commands::render(
                &cli.data_dir,
                &template,
                values.as_deref(),
                pairs,
                qr_image.as_deref(),
                &out,
            )
            .await
        }
        Command::Batch {
            template,
            dataset,
            mapping,
            qr_pattern,
            qr_image,
            out_dir,
            concurrency,
            max_records,
            output_pattern,
        } => {
            let args = commands::BatchArgs {
                template,
                dataset,
                mapping,
                qr_pattern,
                qr_image,
                out_dir,
                concurrency,
                max_records,
                output_pattern,
            };
            commands::batch(&cli.data_dir, args).await
        }
    }
}
