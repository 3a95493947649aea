use anyhow::Result;
use clap::Parser;
use reclaim::cli::Cli;

fn main() -> Result<()> {
    Cli::parse().run()
}
