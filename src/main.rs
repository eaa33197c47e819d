//! Cloud Info CLI
//!
//! Detects the cloud provider and region of the surrounding environment
//! and prints the result as JSON.
//!
//! # Usage
//! ```bash
//! # From inside a cluster, using node metadata
//! cloudinfo --node-labels
//!
//! # From any cloud VM, probing instance metadata endpoints
//! cloudinfo --imds
//! ```

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use cloudinfo::{detect_cloud_info, ClusterNodeSource, DetectionOptions};

#[derive(Parser)]
#[command(name = "cloudinfo")]
#[command(about = "Detect the cloud provider and region of a Kubernetes cluster", long_about = None)]
#[command(version)]
struct Cli {
    /// Detect from node labels and provider IDs via the cluster API
    #[arg(long, env = "CLOUDINFO_NODE_LABELS")]
    node_labels: bool,

    /// Detect by probing cloud instance metadata endpoints
    #[arg(long, env = "CLOUDINFO_IMDS")]
    imds: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder().with_max_level(level).init();

    let options = DetectionOptions {
        use_node_labels: cli.node_labels,
        use_imds: cli.imds,
    };

    let info = detect_cloud_info(&ClusterNodeSource, options).await?;
    info!("Detection complete via {}", info.source);
    println!("{}", serde_json::to_string_pretty(&info)?);

    Ok(())
}
