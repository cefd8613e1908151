use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use mcp_client::transport::{SseConfig, StderrMode, StdioConfig, TransportConfig};
use mcp_client::{ClientOptions, McpClient, RequestOptions};

#[derive(Parser)]
#[command(name = "mcp-cli")]
#[command(about = "Connect to an MCP server, list its tools and call them")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub server: ServerArgs,

    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub action: Option<Commands>,
}

/// How to reach the server. Exactly one of `--config`, `--command` or `--url`.
#[derive(Args)]
pub struct ServerArgs {
    /// Transport configuration file (.json, .yaml or .toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// MCP server command (stdio transport)
    #[arg(short, long, global = true)]
    pub command: Option<String>,

    /// Argument passed to the server command; repeat for more
    #[arg(short, long = "arg", global = true, allow_hyphen_values = true)]
    pub args: Vec<String>,

    /// SSE endpoint URL (sse transport)
    #[arg(short, long, global = true)]
    pub url: Option<String>,

    /// HTTP header for the SSE transport, as KEY=VALUE
    #[arg(long = "header", global = true)]
    pub headers: Vec<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show server name, protocol version and capabilities (default)
    Info,
    /// List the tools the server offers
    Tools,
    /// Call a tool
    Call {
        /// Tool name
        name: String,

        /// Arguments as a JSON object
        #[arg(default_value = "{}")]
        arguments: String,
    },
    /// List the resources the server offers
    Resources,
    /// List the prompts the server offers
    Prompts,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = transport_config(&cli.server)?;
    let client = McpClient::connect(config, ClientOptions::default())
        .await
        .context("Failed to connect to MCP server")?;

    let outcome = run(&client, cli.action.unwrap_or(Commands::Info)).await;
    client.close().await;
    outcome
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .init();
}

fn transport_config(server: &ServerArgs) -> Result<TransportConfig> {
    match (&server.config, &server.command, &server.url) {
        (Some(path), None, None) => TransportConfig::from_file(path)
            .with_context(|| format!("Failed to load {}", path.display())),
        (None, Some(command), None) => Ok(TransportConfig::Stdio(
            StdioConfig::new(command.clone())
                .args(server.args.iter().cloned())
                .stderr(StderrMode::Piped),
        )),
        (None, None, Some(url)) => {
            let mut config = SseConfig::new(url.parse().context("Invalid --url")?);
            for header in &server.headers {
                let Some((key, value)) = header.split_once('=') else {
                    bail!("Header must be KEY=VALUE: {}", header);
                };
                config = config.header(key.trim(), value.trim());
            }
            Ok(TransportConfig::Sse(config))
        }
        (None, None, None) => bail!("Specify a server with --config, --command or --url"),
        _ => bail!("--config, --command and --url are mutually exclusive"),
    }
}

async fn run(client: &McpClient, command: Commands) -> Result<()> {
    match command {
        Commands::Info => {
            if let Some(info) = client.server_info() {
                println!("Server: {} {}", info.name, info.version);
            }
            if let Some(version) = client.protocol_version() {
                println!("Protocol: {}", version);
            }
            if let Some(instructions) = client.instructions() {
                println!("Instructions: {}", instructions);
            }
            if let Some(capabilities) = client.server_capabilities() {
                println!("Capabilities: {}", serde_json::to_string_pretty(capabilities)?);
            }
        }
        Commands::Tools => {
            let tools = client.tools(None).await?;
            for tool in tools.iter() {
                match tool.description() {
                    Some(description) => println!("{}: {}", tool.name(), description),
                    None => println!("{}", tool.name()),
                }
            }
        }
        Commands::Call { name, arguments } => {
            let arguments: Value =
                serde_json::from_str(&arguments).context("Tool arguments must be valid JSON")?;
            let result = client
                .call_tool(&name, arguments, &RequestOptions::default())
                .await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Resources => {
            let mut cursor = None;
            loop {
                let page = client.list_resources(cursor).await?;
                for resource in page.resources {
                    println!("{} ({})", resource.uri, resource.name);
                }
                match page.next_cursor {
                    Some(next) => cursor = Some(next),
                    None => break,
                }
            }
        }
        Commands::Prompts => {
            let mut cursor = None;
            loop {
                let page = client.list_prompts(cursor).await?;
                for prompt in page.prompts {
                    match prompt.description {
                        Some(description) => println!("{}: {}", prompt.name, description),
                        None => println!("{}", prompt.name),
                    }
                }
                match page.next_cursor {
                    Some(next) => cursor = Some(next),
                    None => break,
                }
            }
        }
    }
    Ok(())
}
