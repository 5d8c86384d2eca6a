use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    chunkscout_cli::main_entry().await
}
