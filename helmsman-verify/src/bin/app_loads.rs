use anyhow::Result;
use helmsman_verify::{init_logging, runs};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    tracing::info!("app load run");
    let ok = runs::app_loads().await?;
    if !ok {
        std::process::exit(1);
    }
    Ok(())
}
