use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    loglens_cli::app::run().await
}
