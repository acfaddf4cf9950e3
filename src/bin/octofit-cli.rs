use clap::{Parser, Subcommand};
use serde_json::Value;

use octofit_api::client::{backend_url, ApiClient};

#[derive(Parser)]
#[command(name = "octofit-cli")]
#[command(about = "Command-line client for the OctoFit Tracker API", long_about = None)]
struct Cli {
    /// Backend origin. Defaults to the Codespace forward or http://localhost:8000.
    #[arg(short, long)]
    url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the API root with every resource URL
    Root,
    /// List records of a resource (users, teams, activities, leaderboard, workouts)
    List { resource: String },
    /// Show one record
    Get { resource: String, id: String },
    /// Create a record from a JSON object
    Create { resource: String, json: String },
    /// Delete one record
    Delete { resource: String, id: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let backend = cli
        .url
        .unwrap_or_else(|| backend_url(|key| std::env::var(key).ok()));
    let client = ApiClient::new(&backend)?;

    match cli.command {
        Commands::Root => print_json(&Value::Object(client.root().await?))?,
        Commands::List { resource } => {
            let items = client.list(&resource).await?;
            eprintln!("{} {} from {}", items.len(), resource, client.api_base());
            print_json(&Value::Array(items))?;
        }
        Commands::Get { resource, id } => print_json(&client.get(&resource, &id).await?)?,
        Commands::Create { resource, json } => {
            let body: Value = serde_json::from_str(&json)?;
            print_json(&client.create(&resource, &body).await?)?;
        }
        Commands::Delete { resource, id } => {
            client.delete(&resource, &id).await?;
            eprintln!("Deleted {resource}/{id}");
        }
    }

    Ok(())
}

fn print_json(value: &Value) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
