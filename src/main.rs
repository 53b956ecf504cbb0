use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use querybind::logging::init_tracing;
use querybind::{Bindings, Config, MutationOptions, QueryOptions, QueryResult};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "querybind", version, about = "Call RPC endpoints through the binding layer")]
struct Cli {
    /// Config file (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a query
    Query {
        path: String,
        /// Arguments as JSON; anything that does not parse is a string
        args: Vec<String>,
    },
    /// Run a mutation
    Mutate { path: String, args: Vec<String> },
    /// Fetch one value from a subscription
    Subscribe { path: String, args: Vec<String> },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("Failed to load config")?;

    let bindings = Bindings::from_config(&config).context("Failed to set up RPC client")?;

    let output = match cli.command {
        Command::Query { path, args } => {
            let mut observer = bindings.bind_query(&path, parse_args(&args), QueryOptions::new())?;
            into_output(observer.settled().await)?
        }
        Command::Subscribe { path, args } => {
            let mut observer =
                bindings.bind_subscription(&path, parse_args(&args), QueryOptions::new())?;
            into_output(observer.settled().await)?
        }
        Command::Mutate { path, args } => {
            let mutation = bindings.bind_mutation(&path, MutationOptions::new())?;
            mutation.mutate_async(parse_args(&args)).await?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn parse_args(raw: &[String]) -> Vec<Value> {
    raw.iter()
        .map(|arg| serde_json::from_str(arg).unwrap_or_else(|_| Value::String(arg.clone())))
        .collect()
}

fn into_output(result: QueryResult) -> Result<Value> {
    if let Some(error) = result.error {
        return Err(error.into());
    }
    Ok(result.data.map(|data| (*data).clone()).unwrap_or(Value::Null))
}
