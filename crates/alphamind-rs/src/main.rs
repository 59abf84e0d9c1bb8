//! Command-line client for the AlphaMind dashboard backend.

use alphamind_rs::config::SettingsSection;
use alphamind_rs::protocol::{AgentPatch, UploadFile};
use alphamind_rs::{Workspace, init_logging, load_config};
use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use log::{debug, info};
use serde::Serialize;
use serde_json::json;
use std::path::{Path, PathBuf};

/// Command-line options for the AlphaMind client.
#[derive(Parser)]
#[command(name = "alphamind", version, about = "Manage AlphaMind agents, chats, data and settings")]
struct Cli {
    /// Optional path to an alphamind.json5 config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Backend base URL, overriding the config
    #[arg(long, global = true)]
    base_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Manage agents
    #[command(subcommand)]
    Agents(AgentsCommand),
    /// Talk to an agent
    #[command(subcommand)]
    Chat(ChatCommand),
    /// Manage files, datasets and knowledge bases
    #[command(subcommand)]
    Data(DataCommand),
    /// Inspect and change dashboard settings
    #[command(subcommand)]
    Settings(SettingsCommand),
    /// Print the dashboard overview
    Summary,
}

#[derive(Subcommand)]
enum AgentsCommand {
    /// List agents
    List,
    /// List agent templates
    Templates,
    /// Create an agent, optionally from a template
    Create {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        temperature: Option<f64>,
        #[arg(long)]
        max_tokens: Option<u32>,
        /// Template id to start from
        #[arg(long)]
        template: Option<String>,
    },
    Delete {
        id: String,
    },
    Activate {
        id: String,
    },
    Deactivate {
        id: String,
    },
    /// Send a test prompt to an agent
    Test {
        id: String,
        message: String,
    },
    /// Fetch usage metrics for an agent
    Metrics {
        id: String,
    },
}

#[derive(Subcommand)]
enum ChatCommand {
    /// Send one message and print the conversation
    Send {
        /// Agent answering the conversation
        #[arg(long)]
        agent: Option<String>,
        message: String,
    },
}

#[derive(Subcommand)]
enum DataCommand {
    Files,
    Datasets,
    KnowledgeBases,
    /// Upload local files
    Upload {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Dataset the files are added to
        #[arg(long)]
        dataset: Option<String>,
    },
    CreateDataset {
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// Search indexed content
    Search {
        query: String,
        #[arg(long)]
        knowledge_base: Option<String>,
    },
}

#[derive(Subcommand)]
enum SettingsCommand {
    Show,
    /// Write settings JSON to a file, or stdout
    Export {
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Replace settings from an exported file
    Import {
        path: PathBuf,
    },
    /// Reset one section (general, integrations, socialMedia, security) or all
    Reset {
        #[arg(long)]
        section: Option<SettingsSection>,
    },
}

/// Entry point for the AlphaMind CLI.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let cli = Cli::parse();
    info!(
        "starting CLI (config_set={}, base_url_set={})",
        cli.config.is_some(),
        cli.base_url.is_some()
    );
    let cwd = std::env::current_dir().context("failed to resolve current working directory")?;
    let mut config = load_config(cli.config.as_deref(), &cwd, cli.base_url.as_deref())
        .context("failed to load config")?;
    if let Command::Chat(ChatCommand::Send {
        agent: Some(agent), ..
    }) = &cli.command
    {
        config.chat.agent_id = Some(agent.clone());
    }

    let workspace = alphamind_rs::connect(&config)
        .await
        .context("failed to build HTTP transport")?;
    let result = run(&workspace, cli.command).await;
    workspace.shutdown();
    result
}

async fn run(workspace: &Workspace, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Agents(command) => run_agents(workspace, command).await,
        Command::Chat(ChatCommand::Send { message, .. }) => {
            let sent = workspace.chat.send_message(&message).await;
            print_json(&workspace.chat.messages())?;
            sent.context("chat send failed")
        }
        Command::Data(command) => run_data(workspace, command).await,
        Command::Settings(command) => run_settings(workspace, command).await,
        Command::Summary => print_json(&workspace.summary()),
    }
}

async fn run_agents(workspace: &Workspace, command: AgentsCommand) -> anyhow::Result<()> {
    let agents = &workspace.agents;
    match command {
        AgentsCommand::List => print_json(&agents.agents()),
        AgentsCommand::Templates => print_json(&agents.templates()),
        AgentsCommand::Create {
            name,
            description,
            model,
            temperature,
            max_tokens,
            template,
        } => {
            let patch = AgentPatch {
                name,
                description,
                model,
                temperature,
                max_tokens,
                ..AgentPatch::default()
            };
            let agent = match template {
                Some(template) => agents.create_from_template(&template, patch).await?,
                None => {
                    if patch.name.is_none() {
                        bail!("--name is required unless --template is given");
                    }
                    agents.create_agent(patch).await?
                }
            };
            print_json(&agent)
        }
        AgentsCommand::Delete { id } => {
            agents.delete_agent(&id).await;
            print_json(&json!({ "deleted": id }))
        }
        AgentsCommand::Activate { id } => {
            agents.activate_agent(&id).await?;
            print_json(&agents.agent(&id))
        }
        AgentsCommand::Deactivate { id } => {
            agents.deactivate_agent(&id).await?;
            print_json(&agents.agent(&id))
        }
        AgentsCommand::Test { id, message } => {
            let response = agents.test_agent(&id, &message).await;
            print_json(&json!({ "agentId": id, "response": response }))
        }
        AgentsCommand::Metrics { id } => print_json(&agents.get_agent_metrics(&id).await),
    }
}

async fn run_data(workspace: &Workspace, command: DataCommand) -> anyhow::Result<()> {
    let data = &workspace.data;
    match command {
        DataCommand::Files => print_json(&data.files()),
        DataCommand::Datasets => print_json(&data.datasets()),
        DataCommand::KnowledgeBases => print_json(&data.knowledge_bases()),
        DataCommand::Upload { paths, dataset } => {
            let mut files = Vec::with_capacity(paths.len());
            for path in &paths {
                files.push(read_upload(path).await?);
            }
            let uploaded = data.upload_files(files, dataset.as_deref()).await?;
            print_json(&uploaded)
        }
        DataCommand::CreateDataset { name, description } => {
            print_json(&data.create_dataset(&name, description.as_deref()).await)
        }
        DataCommand::Search {
            query,
            knowledge_base,
        } => print_json(&data.search_knowledge(&query, knowledge_base.as_deref()).await),
    }
}

async fn run_settings(workspace: &Workspace, command: SettingsCommand) -> anyhow::Result<()> {
    let settings = &workspace.settings;
    match command {
        SettingsCommand::Show => print_json(&settings.settings()),
        SettingsCommand::Export { output } => {
            let exported = settings.export_settings()?;
            match output {
                Some(path) => {
                    tokio::fs::write(&path, exported)
                        .await
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    info!("settings exported (path={})", path.display());
                    Ok(())
                }
                None => {
                    println!("{exported}");
                    Ok(())
                }
            }
        }
        SettingsCommand::Import { path } => {
            let contents = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            let imported = settings.import_settings(&contents).await?;
            print_json(&imported)
        }
        SettingsCommand::Reset { section } => {
            settings.reset_settings(section).await;
            print_json(&settings.settings())
        }
    }
}

async fn read_upload(path: &Path) -> anyhow::Result<UploadFile> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .with_context(|| format!("not a file path: {}", path.display()))?;
    let mime_type = mime_for(path);
    debug!(
        "upload prepared (name={}, bytes={}, type={})",
        name,
        data.len(),
        mime_type
    );
    Ok(UploadFile::new(name, mime_type, data))
}

/// Content type for common dashboard uploads; empty lets the transport pick.
fn mime_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|extension| extension.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("csv") => "text/csv",
        Some("json") => "application/json",
        Some("txt") => "text/plain",
        Some("md") => "text/markdown",
        Some("pdf") => "application/pdf",
        _ => "",
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
