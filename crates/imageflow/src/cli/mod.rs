pub mod check;
pub mod detect;
pub mod dispatch;
pub mod image;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "imgflow",
    about = "Track container image revisions from source to registry",
    version
)]
pub struct Cli {
    /// SQLite database holding image resources
    #[arg(long, global = true, env = "IMAGEFLOW_DB", default_value = "imageflow.db")]
    pub db: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Hand pending revisions to the checker actor and record its verdicts
    Check {
        /// Directory shared with the checker actor (overrides ACTOR_WORK_DIR)
        #[arg(long)]
        work_dir: Option<PathBuf>,
    },
    /// Snapshot branch heads and tags of the source repository
    Detect {
        /// Where to write the snapshot JSON
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Trigger the build workflow for a revision
    Dispatch {
        /// Revision passed to the workflow
        #[arg(short, long)]
        revision: String,
        /// Block until the triggered run concludes
        #[arg(long)]
        wait: bool,
        /// Give up waiting after this many seconds
        #[arg(long, requires = "wait")]
        timeout: Option<u64>,
    },
    /// Manage image resources in the store
    Image {
        #[command(subcommand)]
        command: ImageCommands,
    },
}

#[derive(Subcommand)]
pub enum ImageCommands {
    /// Create an image from a JSON document
    Create {
        /// Path to the image document
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Print an image as JSON
    Show {
        name: String,
        #[arg(short, long, default_value = "default")]
        namespace: String,
    },
    /// List images in a namespace
    List {
        #[arg(short, long, default_value = "default")]
        namespace: String,
    },
}
