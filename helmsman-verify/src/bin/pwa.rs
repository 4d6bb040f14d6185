use anyhow::Result;
use helmsman_verify::{init_logging, runs};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    tracing::info!("pwa run");
    let ok = runs::pwa().await?;
    if !ok {
        std::process::exit(1);
    }
    Ok(())
}
