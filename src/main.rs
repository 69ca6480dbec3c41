//! hive - command-line client for a Hive multi-agent engine
//!
//! Usage:
//!   hive discover                                   → list agent definitions on the server
//!   hive agents load agents/demo.yaml               → load an agent
//!   hive trigger demo main --input '{"query":"hi"}' → start an execution
//!   hive events demo --types node_start,node_end    → stream events as JSON lines
//!   hive config                                     → print the effective config

use anyhow::Context;
use clap::{Parser, Subcommand};
use hive_client::{
    channel_callback, ClientConfig, EventFilter, ExecutionTracker, HiveClient, LogLevel,
    SubscriptionOptions,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "hive",
    about = "Control and observe agents running on a Hive server",
    version = env!("CARGO_PKG_VERSION")
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Base URL of the Hive API (overrides config and HIVE_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Path to client config file (TOML). Default: $HIVE_CONFIG or ~/.hive/client.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Write logs to a file (in addition to stderr)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List agent definitions the server can load
    Discover,
    /// Manage loaded agents
    #[command(subcommand)]
    Agents(AgentsCommand),
    /// Start an execution at an entry point
    Trigger {
        agent: String,
        entry_point: String,
        /// Input payload as JSON
        #[arg(short, long, default_value = "{}")]
        input: String,
        /// Initial session state as JSON
        #[arg(long)]
        state: Option<String>,
    },
    /// Deliver content to a node waiting for input
    Inject {
        agent: String,
        node: String,
        content: String,
        #[arg(short, long)]
        graph: Option<String>,
    },
    /// Send a chat message to an agent
    Chat { agent: String, message: String },
    /// Stop an execution
    Stop { agent: String, execution_id: String },
    /// Pause an execution, creating a checkpoint
    Pause { agent: String, execution_id: String },
    /// Resume a session from a checkpoint (latest if omitted)
    Resume {
        agent: String,
        session: String,
        #[arg(short, long)]
        checkpoint: Option<String>,
    },
    /// Start a new execution from a session checkpoint
    Replay {
        agent: String,
        session: String,
        checkpoint: String,
    },
    /// Show goal progress for an agent
    Progress { agent: String },
    /// Inspect session logs
    #[command(subcommand)]
    Logs(LogsCommand),
    /// Stream live events as JSON lines until Ctrl-C
    Events {
        agent: String,
        /// Comma-separated event types (default: all)
        #[arg(short, long)]
        types: Option<String>,
    },
    /// Print the effective configuration as TOML
    Config,
}

#[derive(Subcommand)]
enum AgentsCommand {
    /// List loaded agents
    List,
    /// Load an agent definition
    Load {
        path: String,
        /// Identity to register the agent under
        #[arg(long)]
        id: Option<String>,
        #[arg(short, long)]
        model: Option<String>,
    },
    /// Show an agent with its entry points and graphs
    Get { agent: String },
    /// Unload an agent
    Unload { agent: String },
    /// Show runtime statistics
    Stats { agent: String },
    /// List entry points
    EntryPoints { agent: String },
    /// List graphs
    Graphs { agent: String },
}

#[derive(Subcommand)]
enum LogsCommand {
    /// Recent sessions
    List {
        agent: String,
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Session summary
    Summary { agent: String, session: String },
    /// Per-node details for a session
    Details { agent: String, session: String },
    /// Per-tool-call steps for a session
    Tools { agent: String, session: String },
    /// Logs for a single node
    Node {
        agent: String,
        graph: String,
        node: String,
        session: String,
        /// summary, details or tools
        #[arg(short, long)]
        level: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _log_guard = init_tracing(cli.log_file.as_deref());

    let config = resolve_config(&cli)?;
    if let Commands::Config = cli.command {
        print!("{}", config.to_toml());
        return Ok(());
    }

    let client = HiveClient::new(config)?;
    run(&client, cli.command).await
}

async fn run(client: &HiveClient, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Discover => print_json(&client.agents().discover().await?),
        Commands::Agents(command) => run_agents(client, command).await,
        Commands::Trigger {
            agent,
            entry_point,
            input,
            state,
        } => {
            let input = parse_json("--input", &input)?;
            let state = state.map(|s| parse_json("--state", &s)).transpose()?;
            let result = client
                .execution()
                .trigger(&agent, &entry_point, input, state)
                .await?;
            print_json(&result)
        }
        Commands::Inject {
            agent,
            node,
            content,
            graph,
        } => print_json(
            &client
                .execution()
                .inject(&agent, &node, &content, graph.as_deref())
                .await?,
        ),
        Commands::Chat { agent, message } => {
            print_json(&client.execution().chat(&agent, &message).await?)
        }
        Commands::Stop {
            agent,
            execution_id,
        } => print_json(&client.execution().stop(&agent, &execution_id).await?),
        Commands::Pause {
            agent,
            execution_id,
        } => print_json(&client.execution().pause(&agent, &execution_id).await?),
        Commands::Resume {
            agent,
            session,
            checkpoint,
        } => print_json(
            &client
                .execution()
                .resume(&agent, &session, checkpoint.as_deref())
                .await?,
        ),
        Commands::Replay {
            agent,
            session,
            checkpoint,
        } => print_json(
            &client
                .execution()
                .replay(&agent, &session, &checkpoint)
                .await?,
        ),
        Commands::Progress { agent } => print_json(&client.execution().goal_progress(&agent).await?),
        Commands::Logs(command) => run_logs(client, command).await,
        Commands::Events { agent, types } => watch_events(client, agent, types).await,
        Commands::Config => Ok(()),
    }
}

async fn run_agents(client: &HiveClient, command: AgentsCommand) -> anyhow::Result<()> {
    let agents = client.agents();
    match command {
        AgentsCommand::List => print_json(&agents.list().await?),
        AgentsCommand::Load { path, id, model } => {
            print_json(&agents.load(&path, id.as_deref(), model.as_deref()).await?)
        }
        AgentsCommand::Get { agent } => print_json(&agents.get(&agent).await?),
        AgentsCommand::Unload { agent } => {
            let unloaded = agents.unload(&agent).await?;
            print_json(&serde_json::json!({ "unloaded": unloaded }))
        }
        AgentsCommand::Stats { agent } => print_json(&agents.stats(&agent).await?),
        AgentsCommand::EntryPoints { agent } => print_json(&agents.entry_points(&agent).await?),
        AgentsCommand::Graphs { agent } => print_json(&agents.graphs(&agent).await?),
    }
}

async fn run_logs(client: &HiveClient, command: LogsCommand) -> anyhow::Result<()> {
    let logs = client.logs();
    match command {
        LogsCommand::List { agent, limit } => print_json(&logs.list(&agent, limit).await?),
        LogsCommand::Summary { agent, session } => print_json(&logs.summary(&agent, &session).await?),
        LogsCommand::Details { agent, session } => print_json(&logs.details(&agent, &session).await?),
        LogsCommand::Tools { agent, session } => print_json(&logs.tools(&agent, &session).await?),
        LogsCommand::Node {
            agent,
            graph,
            node,
            session,
            level,
        } => {
            let level = level.map(|l| l.parse::<LogLevel>()).transpose()?;
            print_json(&logs.node_logs(&agent, &graph, &node, &session, level).await?)
        }
    }
}

/// Print every event as one JSON line and log execution state changes until Ctrl-C.
async fn watch_events(client: &HiveClient, agent: String, types: Option<String>) -> anyhow::Result<()> {
    let filter = types.as_deref().map(EventFilter::parse).unwrap_or_default();
    let (callback, mut events) = channel_callback();
    let mut subscription = client.subscribe(callback);
    subscription.update(SubscriptionOptions::new(agent).with_types(filter));

    let mut tracker = ExecutionTracker::new();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => {
                let Some(event) = event else { break };
                if let (Some(state), Some(id)) = (tracker.observe(&event), event.execution_id.as_deref()) {
                    info!("Execution {} is {}", id, state);
                }
                println!("{}", serde_json::to_string(&event)?);
            }
        }
    }

    subscription.close();
    info!("Tracked {} executions", tracker.len());
    Ok(())
}

fn resolve_config(cli: &Cli) -> anyhow::Result<ClientConfig> {
    let config = match &cli.config {
        // An explicitly named file must exist and parse.
        Some(path) => ClientConfig::try_load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => std::env::var("HIVE_CONFIG")
            .ok()
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|home| home.join(".hive").join("client.toml")))
            .map(|path| ClientConfig::load(&path))
            .unwrap_or_default(),
    };
    let mut config = config.with_env();
    if let Some(url) = &cli.api_url {
        config.api.base_url = url.clone();
    }
    Ok(config)
}

fn parse_json(flag: &str, raw: &str) -> anyhow::Result<serde_json::Value> {
    serde_json::from_str(raw).with_context(|| format!("{} is not valid JSON", flag))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Logs go to stderr so stdout stays machine-readable. The returned guard
/// flushes the file sink on drop.
fn init_tracing(log_file: Option<&Path>) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let (file_layer, guard) = match log_file.and_then(|path| Some((path.parent(), path.file_name()?))) {
        Some((dir, name)) => {
            let dir = dir
                .filter(|d| !d.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            (
                Some(
                    tracing_subscriber::fmt::layer()
                        .with_writer(writer)
                        .with_ansi(false),
                ),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hive=info,hive_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    guard
}
