//! authscope - macOS authorization discovery
//!
//! Finds where the system asks for credentials and which rights guard them.

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    authscope_cli::run().await
}
