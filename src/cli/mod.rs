//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::{Parser, Subcommand};

/// Asynchronous parameterized test runner
#[derive(Parser, Debug)]
#[command(name = "asynctest")]
#[command(author = "hephaex@gmail.com")]
#[command(version = "0.1.0")]
#[command(about = "Run attribute-driven asynchronous test suites, locally or remotely")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the test suite locally
    Run(RunArgs),

    /// List discovered fixtures and cases
    List(ListArgs),

    /// Serve the suite to remote clients
    Listen(ListenArgs),

    /// Run the suite on a remote server
    Connect(ConnectArgs),
}

/// Arguments for run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Category to select (default: all)
    #[arg(short, long)]
    pub category: Option<String>,

    /// Repeat the whole suite this many times
    #[arg(short, long)]
    pub repeat: Option<u32>,

    /// Run fixtures in parallel
    #[arg(short, long)]
    pub parallel: bool,

    /// Number of concurrent fixtures (when parallel)
    #[arg(long, default_value = "4")]
    pub concurrent: usize,

    /// Abort the run after this many seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Settings file (json or yaml)
    #[arg(short, long)]
    pub settings: Option<String>,

    /// Output format (text, json, json-pretty, summary)
    #[arg(short, long, default_value = "text")]
    pub format: String,

    /// Save results to file
    #[arg(short, long)]
    pub output: Option<String>,

    /// Disable ANSI colors
    #[arg(long)]
    pub no_color: bool,
}

/// Arguments for list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Show cases, not just fixtures
    #[arg(short, long)]
    pub detailed: bool,
}

/// Arguments for listen command
#[derive(Parser, Debug)]
pub struct ListenArgs {
    /// Address to listen on
    #[arg(short, long, default_value = "127.0.0.1:8888")]
    pub addr: String,

    /// Settings file (json or yaml)
    #[arg(short, long)]
    pub settings: Option<String>,
}

/// Arguments for connect command
#[derive(Parser, Debug)]
pub struct ConnectArgs {
    /// Server address
    pub addr: String,

    /// Category to select on the server
    #[arg(short, long)]
    pub category: Option<String>,

    /// Repeat override for the remote run
    #[arg(short, long)]
    pub repeat: Option<u32>,

    /// Output format (text, json, json-pretty, summary)
    #[arg(short, long, default_value = "text")]
    pub format: String,

    /// Save results to file
    #[arg(short, long)]
    pub output: Option<String>,

    /// Disable ANSI colors
    #[arg(long)]
    pub no_color: bool,
}
