use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::Write;
use tracing_subscriber::EnvFilter;
use warehouse_chat::chat::ChatService;
use warehouse_chat::config::AppConfig;
use warehouse_chat::llm::ChatMessage;

#[derive(Parser)]
#[command(name = "warehouse-chat")]
#[command(about = "Chat with a local model that can look things up in the data warehouse")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the evidence transcript the model would receive
    Explore {
        /// The chat message in natural language
        message: String,
    },
    /// Run a full chat turn and stream the model's answer
    Ask {
        /// The chat message in natural language
        message: String,
    },
    /// Check warehouse connectivity and list the queryable views
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = AppConfig::from_env()?;
    let service = ChatService::from_config(&config)?;

    match args.command {
        Command::Explore { message } => {
            let transcript = service.explorer().explore(&message).await;
            if transcript.is_empty() {
                println!("(not a data question, nothing explored)");
            } else {
                print!("{}", transcript);
            }
        }
        Command::Ask { message } => {
            let mut rx = service.respond(&[ChatMessage::user(message)]).await?;
            let mut stdout = std::io::stdout();
            while let Some(fragment) = rx.recv().await {
                write!(stdout, "{}", fragment?)?;
                stdout.flush()?;
            }
            writeln!(stdout)?;
        }
        Command::Check => {
            let tools = service.explorer().tools();
            let healthy = tools.store().health_check().await?;
            println!("{} store reachable: {}", tools.store().name(), healthy);
            let listing = tools.list_views().await;
            println!("{}", listing.message);
            for view in &listing.views {
                println!("  - {}", view);
            }
            if let Some(error) = listing.error {
                anyhow::bail!("listing views failed: {}", error);
            }
        }
    }

    Ok(())
}
