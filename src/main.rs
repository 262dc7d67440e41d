//! Skittles command line
//!
//! Issues one Foursquare API call using configuration from `SKITTLES_*`
//! environment variables and prints the result as JSON

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use skittles::config::Configuration;
use skittles::services::{Client, HttpMethod, RequestDescriptor};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "skittles", version, about = "Foursquare v2 API client")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Perform a GET request
    Get(CallArgs),
    /// Perform a POST request
    Post(CallArgs),
    /// Perform a PUT request
    Put(CallArgs),
    /// Perform a DELETE request
    Delete(CallArgs),
    /// Print the URL a user visits to authorize this application
    AuthorizeUrl {
        /// Redirect URI registered for the application
        redirect_uri: String,
    },
    /// Print the effective configuration
    Options,
}

#[derive(Debug, clap::Args)]
struct CallArgs {
    /// API path relative to the endpoint, e.g. venues/search
    path: String,

    /// Query parameters as key=value
    #[arg(value_parser = parse_param)]
    params: Vec<(String, String)>,

    /// Print the undecoded response body
    #[arg(long)]
    raw: bool,

    /// Print only this member of the payload (dotted path, e.g. venues.0.name)
    #[arg(long)]
    member: Option<String>,
}

fn parse_param(s: &str) -> std::result::Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{}'", s))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();
    let config = Configuration::from_env().context("Failed to load configuration")?;

    match cli.command {
        Command::Get(args) => call(config, HttpMethod::Get, args).await,
        Command::Post(args) => call(config, HttpMethod::Post, args).await,
        Command::Put(args) => call(config, HttpMethod::Put, args).await,
        Command::Delete(args) => call(config, HttpMethod::Delete, args).await,
        Command::AuthorizeUrl { redirect_uri } => {
            println!("{}", config.authorize_url(&redirect_uri)?);
            Ok(())
        }
        Command::Options => {
            let mut options = config.options();
            for secret in ["access_token", "client_secret"] {
                if let Some(Some(value)) = options.get_mut(secret) {
                    *value = "[redacted]".to_string();
                }
            }
            println!("{}", serde_json::to_string_pretty(&options)?);
            Ok(())
        }
    }
}

async fn call(config: Configuration, method: HttpMethod, args: CallArgs) -> Result<()> {
    let client = Client::from_config(config).context("Failed to create API client")?;
    info!("{} {}", method, args.path);

    let descriptor = RequestDescriptor::new(method, &args.path)
        .params(args.params)
        .raw(args.raw);

    let outcome = client
        .execute(descriptor)
        .await
        .with_context(|| format!("{} {} failed", method, args.path))?;

    if args.raw {
        println!("{}", outcome.into_raw()?);
        return Ok(());
    }

    let payload = outcome.into_payload()?;
    let value = match args.member.as_deref() {
        Some(path) => payload
            .path(path)
            .cloned()
            .with_context(|| format!("Payload has no member '{}'", path))?,
        None => payload.into_value(),
    };
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

/// Initialize logging system
fn init_logging() {
    // Get log level from environment variable, default to warn
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string());

    // Check if JSON format should be used
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let subscriber: Box<dyn tracing::Subscriber + Send + Sync> = if log_format == "json" {
        Box::new(
            tracing_subscriber::fmt()
                .with_env_filter(log_level)
                .with_writer(std::io::stderr)
                .json()
                .with_current_span(true)
                .with_span_list(false)
                .finish(),
        )
    } else {
        Box::new(
            tracing_subscriber::fmt()
                .with_env_filter(log_level)
                .with_writer(std::io::stderr)
                .with_target(false)
                .finish(),
        )
    };

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("Failed to set tracing subscriber");
    }
}
