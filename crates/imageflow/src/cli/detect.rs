use std::path::Path;

use anyhow::Result;
use imageflow_core::{Detector, GithubClient, GithubConfig};

pub async fn run(output: &Path) -> Result<()> {
    let config = GithubConfig::from_env()?;
    let client = GithubClient::new(&config)?;
    let detector = Detector::new(client, config.branches, config.tags);

    let snapshot = detector.write_snapshot(output).await?;
    println!(
        "Wrote {} branch(es) and {} tag(s) to {}",
        snapshot.branches.len(),
        snapshot.tags.len(),
        output.display()
    );
    Ok(())
}
