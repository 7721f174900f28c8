//! Scene compositing CLI tool
//!
//! Places a segmented subject onto a background photo with a cast shadow,
//! color harmonization and film grain.

#[cfg(feature = "cli")]
use scene_composite::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Please rebuild with --features cli");
    std::process::exit(2);
}
