use clap::Subcommand;
use serde_json::Value;

use crate::cli::utils::output_value;
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum ServerCommands {
    #[command(about = "Show server information from the API root endpoint")]
    Info {
        #[arg(long, default_value = "http://localhost:3000", help = "Server base URL")]
        url: String,
    },

    #[command(about = "Check server health status from the /health endpoint")]
    Health {
        #[arg(long, default_value = "http://localhost:3000", help = "Server base URL")]
        url: String,
    },
}

async fn fetch(base: &str, path: &str) -> anyhow::Result<(reqwest::StatusCode, Value)> {
    let url = format!("{}{}", base.trim_end_matches('/'), path);
    let response = reqwest::Client::new().get(&url).send().await?;
    let status = response.status();
    let body = response.json::<Value>().await?;
    Ok((status, body))
}

pub async fn handle(cmd: ServerCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        ServerCommands::Info { url } => {
            let (_, body) = fetch(&url, "/").await?;
            output_value(output_format, body.get("data").unwrap_or(&body))
        }
        ServerCommands::Health { url } => {
            let (status, body) = fetch(&url, "/health").await?;
            output_value(output_format, body.get("data").unwrap_or(&body))?;
            if !status.is_success() {
                anyhow::bail!("server at {} is unhealthy ({})", url, status);
            }
            Ok(())
        }
    }
}
