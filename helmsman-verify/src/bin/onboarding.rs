use anyhow::Result;
use helmsman_verify::{config, init_logging, runs};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    tracing::info!("onboarding run (desktop profile)");
    let ok = runs::onboarding("success_desktop", config::desktop()).await?;
    if !ok {
        std::process::exit(1);
    }
    Ok(())
}
