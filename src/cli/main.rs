use clap::{Parser, Subcommand};
use reqwest::Client;
use serde_json::{json, Map, Value};
use std::error::Error;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "search-gateway-cli")]
#[command(about = "Search gateway CLI", long_about = None)]
struct Cli {
    #[arg(short, long, env = "SEARCH_GATEWAY_ENDPOINT", default_value = "http://127.0.0.1:8800")]
    endpoint: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search an index
    Search {
        /// Keyword query (may be empty)
        #[arg(default_value = "")]
        query: String,

        /// Index uid; defaults to the server's default index
        #[arg(short, long)]
        index: Option<String>,

        /// Pinned tool to call instead of the generic search tool
        #[arg(short, long, conflicts_with = "index")]
        tool: Option<String>,

        /// Filter conditions as a JSON object, e.g. '{"category":"Box"}'
        #[arg(short, long)]
        filter: Option<String>,

        /// Sort rule (repeatable), e.g. createdAt:desc
        #[arg(short, long)]
        sort: Vec<String>,

        #[arg(short, long)]
        limit: Option<usize>,

        #[arg(short, long, default_value = "0")]
        offset: usize,

        /// Field to return (repeatable)
        #[arg(short = 'a', long = "attribute")]
        attributes: Vec<String>,
    },

    /// Show index statistics
    Stats {
        #[arg(value_name = "INDEX")]
        index: Option<String>,
    },

    /// List all indexes
    Indexes,

    /// Apply index settings
    InitIndex {
        #[arg(value_name = "INDEX")]
        index: Option<String>,

        /// JSON settings document; the server's declared settings are used when omitted
        #[arg(short, long)]
        settings: Option<PathBuf>,
    },

    /// List available tools
    Tools,

    /// Check server health
    Health {
        /// Also check that the search backend is reachable
        #[arg(short, long)]
        ready: bool,
    },
}

async fn call_tool(client: &Client, endpoint: &str, tool: &str, arguments: Value) -> Result<Value, Box<dyn Error>> {
    let response = client
        .post(format!("{}/v1/tools/{}", endpoint, tool))
        .json(&arguments)
        .send()
        .await?;

    Ok(response.json().await?)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let client = Client::new();

    let body = match cli.command {
        Commands::Search {
            query,
            index,
            tool,
            filter,
            sort,
            limit,
            offset,
            attributes,
        } => {
            let mut arguments = Map::new();
            arguments.insert("query".to_string(), json!(query));
            arguments.insert("offset".to_string(), json!(offset));
            if let Some(index) = index {
                arguments.insert("index".to_string(), json!(index));
            }
            if let Some(filter) = filter {
                let conditions: Value = serde_json::from_str(&filter)
                    .map_err(|e| format!("--filter is not valid JSON: {}", e))?;
                arguments.insert("filter_conditions".to_string(), conditions);
            }
            if !sort.is_empty() {
                arguments.insert("sort".to_string(), json!(sort));
            }
            if let Some(limit) = limit {
                arguments.insert("limit".to_string(), json!(limit));
            }
            if !attributes.is_empty() {
                arguments.insert("attributes_to_retrieve".to_string(), json!(attributes));
            }

            let tool = tool.unwrap_or_else(|| "search".to_string());
            call_tool(&client, &cli.endpoint, &tool, Value::Object(arguments)).await?
        }

        Commands::Stats { index } => {
            call_tool(&client, &cli.endpoint, "get_index_stats", json!({ "index": index })).await?
        }

        Commands::Indexes => call_tool(&client, &cli.endpoint, "get_all_indexes", json!({})).await?,

        Commands::InitIndex { index, settings } => {
            let mut arguments = Map::new();
            if let Some(index) = index {
                arguments.insert("index".to_string(), json!(index));
            }
            if let Some(path) = settings {
                let raw = std::fs::read_to_string(&path)?;
                let document: Value = serde_json::from_str(&raw)
                    .map_err(|e| format!("{} is not valid JSON: {}", path.display(), e))?;
                arguments.insert("settings".to_string(), document);
            }
            call_tool(&client, &cli.endpoint, "init_index", Value::Object(arguments)).await?
        }

        Commands::Tools => {
            let response = client
                .get(format!("{}/v1/tools", cli.endpoint))
                .send()
                .await?;
            response.json::<Value>().await?
        }

        Commands::Health { ready } => {
            let path = if ready { "health/ready" } else { "health" };
            let response = client
                .get(format!("{}/{}", cli.endpoint, path))
                .send()
                .await?;
            response.json::<Value>().await?
        }
    };

    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}
