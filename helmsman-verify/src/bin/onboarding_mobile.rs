use anyhow::Result;
use helmsman_verify::{config, init_logging, runs};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    tracing::info!("onboarding run (mobile profile)");
    let ok = runs::onboarding("success_mobile", config::mobile()).await?;
    if !ok {
        std::process::exit(1);
    }
    Ok(())
}
