//! PropBridge CLI - Command-line client for a running PropBridge
//!
//! `get`/`set` talk to the REST adapter, `call`/`watch` to the JSON-RPC
//! WebSocket adapter.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use propbridge_sdk::{Notification, PropBridgeClient, SdkError};
use serde_json::Value;
use tokio::sync::broadcast::error::RecvError;

const DEFAULT_REST_URL: &str = "http://127.0.0.1:45678";
const DEFAULT_RPC_URL: &str = "ws://127.0.0.1:45679";

#[derive(Parser)]
#[command(name = "propbridge")]
#[command(about = "PropBridge CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// REST adapter URL
    #[arg(long, env = "PROPBRIDGE_REST_URL", default_value = DEFAULT_REST_URL)]
    rest_url: String,

    /// JSON-RPC WebSocket URL
    #[arg(long, env = "PROPBRIDGE_RPC_URL", default_value = DEFAULT_RPC_URL)]
    rpc_url: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Read a property over REST
    Get {
        /// Class identifier (e.g., Counter)
        class: String,

        /// Property name (e.g., value)
        property: String,
    },

    /// Write a property over REST
    Set {
        /// Class identifier
        class: String,

        /// Property name
        property: String,

        /// New value as plain text
        value: String,
    },

    /// Send one JSON-RPC request
    Call {
        /// Method as Class.property
        method: String,

        /// Params as JSON (omit to read)
        params: Option<String>,
    },

    /// Print change notifications until interrupted
    Watch {
        /// Only show notifications for this Class.property
        #[arg(short, long)]
        method: Option<String>,
    },
}

fn property_url(base: &str, class: &str, property: &str) -> String {
    format!("{}/{}/{}", base.trim_end_matches('/'), class, property)
}

fn parse_params(params: Option<&str>) -> Result<Option<Value>> {
    params
        .map(|text| serde_json::from_str(text).context("Invalid JSON params"))
        .transpose()
}

/// Send one REST request; non-200 answers become errors carrying the body.
async fn rest(request: reqwest::RequestBuilder) -> Result<String> {
    let response = request
        .send()
        .await
        .context("Failed to connect to REST adapter")?;
    let status = response.status();
    let body = response.text().await.context("Failed to read response")?;

    if !status.is_success() {
        anyhow::bail!("REST error ({}): {}", status.as_u16(), body);
    }
    Ok(body)
}

fn print_notification(notification: &Notification) {
    println!(
        "{} {}",
        notification.method.cyan().bold(),
        notification.params
    );
}

async fn watch(client: PropBridgeClient, method: Option<String>) -> Result<()> {
    let mut notifications = client.notifications();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            received = notifications.recv() => match received {
                Ok(notification) => {
                    if method.as_deref().map_or(true, |m| m == notification.method) {
                        print_notification(&notification);
                    }
                }
                Err(RecvError::Lagged(missed)) => {
                    println!("{}", format!("… {} notifications missed", missed).yellow());
                }
                Err(RecvError::Closed) => {
                    println!("{}", "Connection closed".yellow());
                    break;
                }
            },
        }
    }

    client.close().await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let http = reqwest::Client::new();

    match cli.command {
        Commands::Get { class, property } => {
            let url = property_url(&cli.rest_url, &class, &property);
            let body = rest(http.get(&url)).await?;
            println!("{}", body);
        }

        Commands::Set {
            class,
            property,
            value,
        } => {
            let url = property_url(&cli.rest_url, &class, &property);
            rest(http.put(&url).body(value.clone())).await?;
            println!(
                "{}",
                format!("✓ {}.{} = {}", class, property, value).green().bold()
            );
        }

        Commands::Call { method, params } => {
            let params = parse_params(params.as_deref())?;
            let client = PropBridgeClient::connect(&cli.rpc_url)
                .await
                .context("Failed to connect to JSON-RPC adapter")?;

            let outcome = client.call(&method, params).await;
            client.close().await;

            match outcome {
                Ok(result) => println!("{}", serde_json::to_string_pretty(&result)?),
                Err(SdkError::Rpc { code, message }) => {
                    println!("{} {} ({})", "✗".red(), message, code);
                    std::process::exit(1);
                }
                Err(e) => return Err(e).context("JSON-RPC call failed"),
            }
        }

        Commands::Watch { method } => {
            let client = PropBridgeClient::connect(&cli.rpc_url)
                .await
                .context("Failed to connect to JSON-RPC adapter")?;

            println!("{} {}", "Watching".cyan().bold(), cli.rpc_url);
            watch(client, method).await?;
        }
    }

    Ok(())
}
