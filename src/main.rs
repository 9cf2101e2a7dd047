use anyhow::Result;

mod demo;

#[tokio::main]
async fn main() -> Result<()> {
    pretty_env_logger::init();

    demo::run().await?;

    Ok(())
}
