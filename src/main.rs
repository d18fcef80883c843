use anyhow::Result;
use clap::Parser;

use citegraph::cli::{Cli, Commands};
use citegraph::commands::{run_pipeline, run_rank, run_recommend};

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Rank(args) => {
            run_rank(args)?;
        }
        Commands::Recommend(args) => {
            run_recommend(args)?;
        }
        Commands::Pipeline(args) => {
            run_pipeline(args)?;
        }
    }

    Ok(())
}
