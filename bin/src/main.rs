//! fxstream CLI - Streams forex prices and account events.

use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand};
use fxstream_lib::prelude::*;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod commands;
mod display;

use display::Format;

#[derive(Parser)]
#[command(name = "fxstream")]
#[command(about = "Streams forex prices and account events", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(flatten)]
    connection: ConnectionArgs,
}

/// Options shared by all streaming commands.
#[derive(Args)]
struct ConnectionArgs {
    /// Trading environment (sandbox, practice, live)
    #[arg(long, global = true, default_value = "practice")]
    env: Environment,

    /// Personal access token
    #[arg(long, global = true, env = "FXSTREAM_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Account id
    #[arg(long, global = true, env = "FXSTREAM_ACCOUNT")]
    account: Option<AccountId>,

    /// Override the streaming host (e.g. http://localhost:8080)
    #[arg(long, global = true)]
    stream_url: Option<String>,

    /// Seconds without data before reconnecting
    #[arg(long, global = true, default_value = "10")]
    stall_timeout: u64,

    /// Pending records kept per instrument or account
    #[arg(long, global = true, default_value = "5")]
    buffer: usize,

    /// Print heartbeats
    #[arg(long, global = true)]
    heartbeats: bool,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "text")]
    format: Format,
}

impl ConnectionArgs {
    fn client(&self, account_id: AccountId) -> Result<StreamClient> {
        let mut config = ClientConfig::new(self.env, account_id);
        config.token.clone_from(&self.token);
        config.stream_url.clone_from(&self.stream_url);

        let stream = StreamConfig::default()
            .with_queue_capacity(self.buffer)
            .with_stall_timeout(Duration::from_secs(self.stall_timeout));

        Ok(StreamClient::new(config)?.with_stream_config(stream))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Stream prices for one or more instruments
    Prices {
        /// Instrument symbols (e.g., EUR_USD USD_JPY)
        #[arg(required = true)]
        instruments: Vec<Instrument>,
    },

    /// Stream account events
    Events {
        /// Accounts to follow. Defaults to --account.
        #[arg(long = "id")]
        accounts: Vec<AccountId>,
    },
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "fxstream_client=info,info",
        2 => "fxstream_client=debug,info",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose > 1)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // Show help if no command provided
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Prices { instruments } => {
            commands::prices::prices(&cli.connection, instruments).await
        }
        Commands::Events { accounts } => commands::events::events(&cli.connection, accounts).await,
    }
}
