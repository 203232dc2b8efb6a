use clap::Parser;
use geowar_server::{args::Args, run, setup_logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();
    let args = Args::parse();
    run(args)
        .await
        .map_err(|e| anyhow::anyhow!("unable to run geowar server: {e}"))
}
