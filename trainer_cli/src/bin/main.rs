use anyhow::Result;
use clap::Parser;
use trainer_cli::app::TrainerApp;

#[tokio::main]
async fn main() -> Result<()> {
    let app = TrainerApp::parse();

    app.run().await?;

    Ok(())
}
