// CLI main entry point
use anyhow::Result;
use jobboard::app::run;
use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;
#[tokio::main]
async fn main() -> Result<()> {
    run().await
}
