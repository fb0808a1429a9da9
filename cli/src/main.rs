//! `queuectl` — a thin passthrough over the job queue HTTP surface
//! (spec §6.4). Argument parsing and presentation only: every subcommand
//! maps to exactly one HTTP call, and the process exit code mirrors the
//! HTTP status (0 on 2xx, non-zero otherwise).

mod client;

use clap::{Parser, Subcommand};
use colored::Colorize;
use serde_json::{json, Value};

use client::ApiClient;

#[derive(Parser)]
#[command(name = "queuectl", about = "Client for the shell-job queue API")]
struct Cli {
    /// Base URL of the running job queue server.
    #[arg(long, env = "QUEUECTL_URL", default_value = "http://localhost:8000")]
    url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Enqueue a new job.
    Enqueue {
        id: String,
        command: String,
        #[arg(long)]
        max_retries: Option<u32>,
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// Patch an existing job.
    Update {
        id: String,
        #[arg(long)]
        command: Option<String>,
        #[arg(long)]
        state: Option<String>,
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// List jobs, optionally filtered by state.
    List {
        #[arg(long)]
        state: Option<String>,
    },
    /// Worker pool lifecycle.
    Worker {
        #[command(subcommand)]
        action: WorkerAction,
    },
    /// Aggregate queue status.
    Status,
    /// Dead Letter Queue operations.
    Dlq {
        #[command(subcommand)]
        action: DlqAction,
    },
    /// Runtime config tunables.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum WorkerAction {
    Start {
        #[arg(long, default_value_t = 1)]
        count: u32,
    },
    Stop,
}

#[derive(Subcommand)]
enum DlqAction {
    List,
    Retry { id: String },
}

#[derive(Subcommand)]
enum ConfigAction {
    Get { key: String },
    Set { key: String, value: f64 },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let client = ApiClient::new(cli.url);

    let result = run(&client, cli.command).await;
    match result {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value).unwrap_or_default());
        }
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}

async fn run(client: &ApiClient, command: Command) -> anyhow::Result<Value> {
    match command {
        Command::Enqueue {
            id,
            command,
            max_retries,
            timeout,
        } => {
            let mut body = json!({ "id": id, "command": command });
            if let Some(v) = max_retries {
                body["max_retries"] = json!(v);
            }
            if let Some(v) = timeout {
                body["timeout"] = json!(v);
            }
            client.post_json("/enqueue", &body).await
        }
        Command::Update {
            id,
            command,
            state,
            timeout,
        } => {
            let mut body = json!({ "id": id });
            if let Some(v) = command {
                body["command"] = json!(v);
            }
            if let Some(v) = state {
                body["state"] = json!(v);
            }
            if let Some(v) = timeout {
                body["timeout"] = json!(v);
            }
            client.put_json("/update", &body).await
        }
        Command::List { state } => {
            let path = match state {
                Some(s) => format!("/list?state={s}"),
                None => "/list".to_string(),
            };
            client.get(&path).await
        }
        Command::Worker { action } => match action {
            WorkerAction::Start { count } => {
                client.get(&format!("/worker/start?num_workers={count}")).await
            }
            WorkerAction::Stop => client.get("/worker/stop").await,
        },
        Command::Status => client.get("/status").await,
        Command::Dlq { action } => match action {
            DlqAction::List => client.get("/dlq/list").await,
            DlqAction::Retry { id } => client.post_empty(&format!("/dlq/retry?job_id={id}")).await,
        },
        Command::Config { action } => match action {
            ConfigAction::Get { key } => client.get(&format!("/config/get?key={key}")).await,
            ConfigAction::Set { key, value } => {
                client.post_json("/config/set", &json!({ "key": key, "value": value })).await
            }
        },
    }
}
