use clap::Parser;
use solar_atlas::cli::{run, Cli};
use solar_atlas::utils::logging::init_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_file.as_deref())?;
    run(cli).await?;
    Ok(())
}
