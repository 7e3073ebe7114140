//! Background replacement CLI tool
//!
//! Command-line interface for the bgcompose pipeline: remote background
//! removal, background image search, and cover-fit compositing.

#[cfg(feature = "cli")]
use bgcompose::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    panic!("CLI feature not enabled. Please rebuild with --features cli");
}
