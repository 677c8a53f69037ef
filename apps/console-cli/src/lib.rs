#![allow(clippy::print_stdout, clippy::print_stderr)]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use manus_console_client::{ConsoleApi, ConsoleRuntime, HttpTransport};
use manus_console_core::chat::EMPTY_OUTPUT_TEXT;
use manus_console_core::config::{
    BACKEND_BASE_SOURCE_DEFAULT, ENV_BACKEND_BASE_URL, resolve_backend_base_url,
};
use manus_console_core::poller::LOGS_EMPTY_TEXT;
use manus_console_core::settings::mask_value;
use manus_console_core::{AgentAction, ConsoleConfig};
use tokio::io::{AsyncBufReadExt, BufReader};

pub mod render;
pub mod repl;

use render::ViewRenderer;
use repl::{HELP_TEXT, ReplAction, parse_line};

#[derive(Parser, Debug)]
#[command(name = "manus-console")]
#[command(about = "Operate a remote agent: logs, start/stop, chat and API keys")]
pub struct ConsoleCli {
    /// Backend base URL. Overrides MANUS_CONSOLE_BACKEND_URL and the config file.
    #[arg(long, global = true)]
    pub backend_url: Option<String>,
    /// TOML console config; `${NAME}` placeholders resolve from the environment.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the current agent logs
    Logs,
    /// Start or stop the agent
    Agent {
        #[command(subcommand)]
        action: AgentCommand,
    },
    /// Send one chat message and print the answer
    Chat {
        #[arg(required = true, num_args = 1..)]
        message: Vec<String>,
    },
    /// List configured API keys (values masked)
    Keys,
    /// Interactive console session
    Console,
}

#[derive(Subcommand, Debug)]
pub enum AgentCommand {
    Start {
        #[arg(long)]
        agent_type: Option<String>,
    },
    Stop,
}

/// Resolves the console config. The backend URL comes from the flag, then
/// the environment, then the config file, then the built-in default.
pub fn load_config(
    backend_url: Option<&str>,
    config_path: Option<&Path>,
) -> Result<(ConsoleConfig, &'static str)> {
    let (config, file_source) = match config_path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("read console config {}", path.display()))?;
            let config = ConsoleConfig::from_toml_str(&raw, |name| std::env::var(name).ok())
                .with_context(|| format!("parse console config {}", path.display()))?;
            (config, "config_file")
        }
        None => (ConsoleConfig::default(), BACKEND_BASE_SOURCE_DEFAULT),
    };

    if let Some(flag) = backend_url {
        return Ok((config.with_backend_base_url(flag)?, "flag"));
    }
    let (env_url, env_source) = resolve_backend_base_url()?;
    if env_source == ENV_BACKEND_BASE_URL {
        return Ok((config.with_backend_base_url(&env_url)?, env_source));
    }
    Ok((config, file_source))
}

pub async fn run(cli: ConsoleCli) -> Result<()> {
    let (config, source) = load_config(cli.backend_url.as_deref(), cli.config.as_deref())?;
    tracing::info!(
        backend_base_url = config.backend_base_url.as_str(),
        source,
        "console backend resolved"
    );

    match cli.command {
        Commands::Logs => {
            let api = ConsoleApi::over_http(&config)?;
            let logs = api.fetch_logs().await?;
            if logs.is_empty() {
                println!("{LOGS_EMPTY_TEXT}");
            }
            for line in logs {
                println!("{line}");
            }
        }
        Commands::Agent { action } => {
            let api = ConsoleApi::over_http(&config)?;
            let (action, result) = match action {
                AgentCommand::Start { agent_type } => {
                    let agent_type = agent_type.unwrap_or_else(|| config.default_agent_type.clone());
                    if !config.agent_types.contains(&agent_type) {
                        return Err(anyhow!("Unknown agent type: {agent_type}"));
                    }
                    (AgentAction::Start, api.start_agent(&agent_type).await)
                }
                AgentCommand::Stop => (AgentAction::Stop, api.stop_agent().await),
            };
            match result {
                Ok(_) => println!("{}", action.success_text()),
                Err(error) => return Err(anyhow!("{}: {error}", action.error_prefix())),
            }
        }
        Commands::Chat { message } => {
            let api = ConsoleApi::over_http(&config)?;
            let response = api
                .chat(&message.join(" "))
                .await
                .map_err(|error| anyhow!("Error sending message: {error}"))?;
            if response.error {
                eprintln!("warning: Agent responded with an error");
            }
            let output = response
                .output
                .filter(|output| !output.trim().is_empty())
                .unwrap_or_else(|| EMPTY_OUTPUT_TEXT.to_string());
            println!("{output}");
        }
        Commands::Keys => {
            let api = ConsoleApi::over_http(&config)?;
            let keys = api.load_keys().await?;
            if keys.is_empty() {
                println!("(no keys configured)");
            }
            for (name, value) in &keys {
                println!("{name}: {}", mask_value(value));
            }
        }
        Commands::Console => run_console(config).await?,
    }
    Ok(())
}

async fn run_console(config: ConsoleConfig) -> Result<()> {
    let transport = Arc::new(HttpTransport::new(&config.backend_base_url)?);
    println!(
        "Connected to {} (type /help for commands)",
        config.backend_base_url
    );
    let (handle, runtime_task) = ConsoleRuntime::spawn(config, transport);

    let mut views = handle.subscribe();
    let render_task = tokio::spawn(async move {
        let mut renderer = ViewRenderer::default();
        loop {
            let view = views.borrow_and_update().clone();
            let clock = chrono::Local::now().format("%H:%M:%S").to_string();
            for line in renderer.render(&view, &clock) {
                println!("{line}");
            }
            if views.changed().await.is_err() {
                break;
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_line(&line, handle.view().mode) {
            Ok(None) => {}
            Ok(Some(ReplAction::Send(commands))) => {
                for command in commands {
                    handle.send(command)?;
                }
            }
            Ok(Some(ReplAction::Help)) => println!("{HELP_TEXT}"),
            Ok(Some(ReplAction::Quit)) => break,
            Err(error) => eprintln!("{error}"),
        }
    }

    handle.shutdown()?;
    runtime_task.await?;
    render_task.await?;
    Ok(())
}
