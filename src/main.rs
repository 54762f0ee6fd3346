//! kube-checker - audits a Kubernetes cluster for deprecated APIs and
//! common misconfigurations

use anyhow::Result;
use clap::Parser;
use kube_checker::cli::{self, Args};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_file = cli::init_logging(args.debug)?;
    if let Some(ref log_path) = log_file {
        eprintln!(
            "Debug logging enabled. Logs written to: {}",
            log_path.display()
        );
    }

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling audit");
            interrupt.cancel();
        }
    });

    cli::run(args, cancel).await
}
