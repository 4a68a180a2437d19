use std::path::PathBuf;

use anyhow::Result;
use imageflow_core::{CheckConfig, CheckOutcome, Checker, FileChannel, SqliteImageStore};

pub async fn run(db: &str, work_dir: Option<PathBuf>) -> Result<()> {
    let mut config = CheckConfig::from_env()?;
    if let Some(dir) = work_dir {
        config.work_dir = dir;
    }

    let store = SqliteImageStore::open(db).await?;
    let channel = FileChannel::new(&config.work_dir);
    let checker = Checker::new(store, channel, config.options());

    let stop = checker.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stop.stop();
        }
    });

    tracing::info!(
        image = %format!("{}/{}", config.image_namespace, config.image_name),
        work_dir = %config.work_dir.display(),
        "checker started"
    );

    match checker.run().await? {
        CheckOutcome::Completed { revisions } => {
            println!("Checked {revisions} revision(s) for {}", config.image_name);
        }
        CheckOutcome::Stopped => println!("Check stopped"),
    }
    Ok(())
}
