use std::path::PathBuf;

use clap::{Parser, Subcommand};
use http_relay::observability::logging;
use relay_sdk::{ForwardData, ForwardOptions, RelayClient, RelayResult, DEFAULT_CONFIG_FILE};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde_json::{Map, Value};

#[derive(Parser)]
#[command(name = "relay-cli")]
#[command(about = "Command-line client for the HTTP relay", long_about = None)]
struct Cli {
    /// Client config file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Relay server URL, overriding the config.
    #[arg(short, long)]
    url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show relay server status
    Status,
    /// Show the relay's outbound IP and location
    IpInfo,
    /// Forward a request through the relay
    Forward {
        /// Target URL
        target: String,
        /// HTTP method
        #[arg(short = 'X', long, default_value = "GET")]
        method: String,
        /// Header as "Name: value" (repeatable)
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,
        /// Request body; sent as JSON when it parses as JSON
        #[arg(short, long)]
        data: Option<String>,
        /// Query parameter as "key=value" (repeatable)
        #[arg(short, long = "param")]
        params: Vec<String>,
    },
    /// Current time via the relay
    Time,
    /// Current weather via the relay
    Weather { location: String },
    /// Inspect or change the client config
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective config
    Show,
    /// Set a key and write the config file
    Set { key: String, value: String },
    /// Write the effective config to a file
    Save { path: Option<PathBuf> },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging("warn");
    let cli = Cli::parse();

    let mut client = RelayClient::from_file(&cli.config)?;
    if let Some(url) = cli.url {
        let mut changes = Map::new();
        changes.insert("server_url".to_string(), Value::String(url));
        client.update_config(changes)?;
    }

    let result = match cli.command {
        Commands::Status => client.get_server_status().await,
        Commands::IpInfo => client.get_ip_info().await,
        Commands::Time => client.get_time_info().await,
        Commands::Weather { location } => client.get_weather_info(&location).await,
        Commands::Forward {
            target,
            method,
            headers,
            data,
            params,
        } => {
            let options = ForwardOptions {
                method: Method::from_bytes(method.to_uppercase().as_bytes())?,
                headers: parse_headers(&headers)?,
                data: data.map(|raw| match serde_json::from_str(&raw) {
                    Ok(value) => ForwardData::Json(value),
                    Err(_) => ForwardData::Raw(raw),
                }),
                params: parse_params(&params)?,
            };
            client.forward_request(&target, options).await
        }
        Commands::Config { action } => {
            match action {
                ConfigAction::Show => print_json(&Value::Object(client.settings().values().clone()))?,
                ConfigAction::Set { key, value } => {
                    let value = serde_json::from_str(&value).unwrap_or(Value::String(value));
                    let mut changes = Map::new();
                    changes.insert(key, value);
                    client.update_config(changes)?;
                    client.save_config(&cli.config)?;
                    println!("Saved {}", cli.config.display());
                }
                ConfigAction::Save { path } => {
                    let path = path.unwrap_or(cli.config);
                    client.save_config(&path)?;
                    println!("Saved {}", path.display());
                }
            }
            return Ok(());
        }
    };

    print_result(result)
}

fn print_result(result: RelayResult) -> Result<(), Box<dyn std::error::Error>> {
    let failed = result.is_error();
    if let Some(status) = result.status() {
        eprintln!("HTTP {}", status);
    }
    print_json(&result.into_json())?;
    if failed {
        std::process::exit(1);
    }
    Ok(())
}

fn print_json(value: &Value) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_headers(raw: &[String]) -> Result<HeaderMap, Box<dyn std::error::Error>> {
    let mut headers = HeaderMap::new();
    for entry in raw {
        let (name, value) = entry
            .split_once(':')
            .ok_or_else(|| format!("header must be \"Name: value\": {}", entry))?;
        headers.append(
            HeaderName::from_bytes(name.trim().as_bytes())?,
            HeaderValue::from_str(value.trim())?,
        );
    }
    Ok(headers)
}

fn parse_params(raw: &[String]) -> Result<Vec<(String, String)>, Box<dyn std::error::Error>> {
    let mut params = Vec::with_capacity(raw.len());
    for entry in raw {
        let (key, value) = entry
            .split_once('=')
            .ok_or_else(|| format!("param must be key=value: {}", entry))?;
        params.push((key.to_string(), value.to_string()));
    }
    Ok(params)
}
