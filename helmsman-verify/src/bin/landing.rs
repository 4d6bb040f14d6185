use anyhow::Result;
use helmsman_verify::{init_logging, runs};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    tracing::info!("landing page run");
    let ok = runs::landing().await?;
    if !ok {
        std::process::exit(1);
    }
    Ok(())
}
