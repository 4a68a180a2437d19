mod cli;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands, ImageCommands};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "imageflow=info,imageflow_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check { work_dir } => cli::check::run(&cli.db, work_dir).await,
        Commands::Detect { output } => cli::detect::run(&output).await,
        Commands::Dispatch {
            revision,
            wait,
            timeout,
        } => cli::dispatch::run(&revision, wait, timeout).await,
        Commands::Image { command } => match command {
            ImageCommands::Create { file } => cli::image::run_create(&cli.db, &file).await,
            ImageCommands::Show { name, namespace } => {
                cli::image::run_show(&cli.db, &namespace, &name).await
            }
            ImageCommands::List { namespace } => cli::image::run_list(&cli.db, &namespace).await,
        },
    }
}
