//! imgutil CLI Tool
//!
//! Command-line interface for compressing images and keying out flat
//! backgrounds with the imgutil library.

#[cfg(feature = "cli")]
use imgutil::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    panic!("CLI feature not enabled. Please rebuild with --features cli");
}
