use std::time::Duration;

use anyhow::Result;
use imageflow_core::{DispatchOutcome, Dispatcher, GithubClient, GithubConfig, WaitOptions};

pub async fn run(revision: &str, wait: bool, timeout: Option<u64>) -> Result<()> {
    let config = GithubConfig::from_env()?;
    let client = GithubClient::new(&config)?;
    let dispatcher = Dispatcher::new(client).with_wait_options(WaitOptions {
        timeout: timeout.map(Duration::from_secs),
        ..WaitOptions::default()
    });

    match dispatcher.dispatch(revision, wait).await? {
        DispatchOutcome::Dispatched { git_ref } => {
            println!("Dispatched {} on {git_ref} for {revision}", config.workflow_file);
        }
        DispatchOutcome::Succeeded { git_ref, run } => {
            println!(
                "Run {} of {} on {git_ref} succeeded for {revision}",
                run.id, config.workflow_file
            );
        }
    }
    Ok(())
}
