//! Memory store CLI - Entry Point
//!
//! Minimal entry point that delegates to the command module.

#[tokio::main]
async fn main() -> eyre::Result<()> {
    zerg_memory::run().await
}
