use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process::Command;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Tasks for the project", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the project
    Build,
    /// Run the workspace tests
    Test,
    /// Run the simulator
    Run {
        /// Command script to feed the simulator
        #[arg(long)]
        script: Option<String>,
        /// Skip frame and animation delays
        #[arg(long)]
        fast: bool,
    },
}

fn cargo(args: &[&str], what: &str) -> Result<()> {
    let status = Command::new("cargo").args(args).status()?;
    if !status.success() {
        anyhow::bail!("{what} failed");
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Build => {
            println!("Building project...");
            cargo(&["build", "--workspace"], "Build")?;
        }
        Commands::Test => {
            println!("Running tests...");
            cargo(&["test", "--workspace"], "Test")?;
        }
        Commands::Run { script, fast } => {
            println!("Running simulator...");
            let mut args = vec!["run", "-p", "match3-cli", "--"];
            if let Some(script) = script {
                args.extend(["--script", script.as_str()]);
            }
            if *fast {
                args.push("--fast");
            }
            cargo(&args, "Run")?;
        }
    }

    Ok(())
}
