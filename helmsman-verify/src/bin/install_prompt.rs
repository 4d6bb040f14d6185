use anyhow::Result;
use helmsman_verify::{init_logging, runs};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    tracing::info!("install prompt run");
    let ok = runs::install_prompt().await?;
    if !ok {
        std::process::exit(1);
    }
    Ok(())
}
