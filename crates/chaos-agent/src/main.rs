use chaos_agent::runtime::{boot, run};
use tracing::error;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    boot::init_logging();
    let (engine, config) = boot::boot().await?;
    let failures = run::run(&engine, &config).await?;
    if !failures.is_empty() {
        error!("{} container(s) failed", failures.len());
        std::process::exit(1);
    }
    Ok(())
}
