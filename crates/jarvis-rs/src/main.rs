//! `jarvis` command-line entry point.

use anyhow::{Context, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use jarvis_rs::commands::{ChatInput, HELP, SlashCommand, parse_chat_input};
use jarvis_rs::config::{JarvisConfig, LayeredConfigOptions};
use jarvis_rs::core::{ConversationSession, open_session};
use jarvis_rs::memory::{NO_HISTORY, Role, ScopeFilter, TurnRole, render_history};
use log::{debug, info};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};

/// Command-line options for Jarvis.
#[derive(Parser)]
#[command(name = "jarvis", version, about = "Scoped long-term memory for Jarvis")]
struct Cli {
    /// Extra jarvis.json5 files applied over the discovered layers
    #[arg(long, global = true)]
    config: Vec<PathBuf>,
    /// Override session.user_id
    #[arg(long, global = true)]
    user: Option<String>,
    /// Override session.session_id
    #[arg(long, global = true)]
    session: Option<String>,
    /// Override session.project_id
    #[arg(long, global = true)]
    project: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Store one record in long-term memory
    Remember {
        text: String,
        /// Record role, e.g. human, ai, system, ai_parser_error_response
        #[arg(long, default_value = "human")]
        role: Role,
    },
    /// Recall records relevant to a query
    Recall {
        query: String,
        /// Maximum number of records (defaults to memory.recall_k)
        #[arg(long)]
        limit: Option<usize>,
        /// Which part of memory to search
        #[arg(long, value_enum, default_value_t = RecallScope::Project)]
        within: RecallScope,
        /// Only records written on this UTC day (YYYY-MM-DD)
        #[arg(long)]
        day: Option<NaiveDate>,
        /// Only records with this role
        #[arg(long)]
        role: Option<Role>,
    },
    /// List stored records in insertion order
    Records {
        /// Only records of the active project
        #[arg(long)]
        current_project: bool,
    },
    /// Interactive chat loop with a short-term buffer
    Chat,
}

/// Scope constraint applied to a recall.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum RecallScope {
    /// Current user and project
    Project,
    /// Current user and session
    Session,
    /// Current user, any session or project
    User,
    /// Current user, session and project
    Exact,
}

/// Entry point for the Jarvis CLI.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    jarvis_rs::init_logging();

    let cli = Cli::parse();
    let cwd = std::env::current_dir().context("failed to resolve current working directory")?;
    let config = load_config(&cli, &cwd)?;
    let mut session = open_session(&config, &cwd).context("failed to open memory")?;
    info!("jarvis ready ({})", session.scope());

    match cli.command {
        Command::Remember { text, role } => {
            let id = session
                .remember(&text, role)
                .await
                .context("failed to store record")?;
            println!("{id}");
        }
        Command::Recall {
            query,
            limit,
            within,
            day,
            role,
        } => {
            let mut filter = recall_filter(&session, within);
            if let Some(day) = day {
                filter = filter.on_day(day);
            }
            if let Some(role) = role {
                filter = filter.role(role);
            }
            let limit = limit.unwrap_or(session.recall_k());
            let records = session
                .recall(&query, &filter, limit)
                .await
                .context("recall failed")?;
            println!("{}", render_history(&records));
        }
        Command::Records { current_project } => {
            let scope = session.scope();
            for record in session.store().records() {
                if current_project
                    && (record.scope.user_id != scope.user_id
                        || record.scope.project_id != scope.project_id)
                {
                    continue;
                }
                println!(
                    "{}\t{}\t{}\t{}\t{}",
                    record.timestamp.to_rfc3339(),
                    record.scope.project_id,
                    record.scope.session_id,
                    record.role,
                    record.text
                );
            }
        }
        Command::Chat => chat(&mut session).await?,
    }
    Ok(())
}

fn load_config(cli: &Cli, cwd: &Path) -> anyhow::Result<JarvisConfig> {
    let mut options = LayeredConfigOptions::new(cwd);
    options.runtime_paths = cli.config.clone();
    let layered = JarvisConfig::load_layered_with_options(options)
        .context("failed to load layered config")?;
    debug!("layered config loaded (layers={})", layered.layers.len());

    let mut config = layered.config;
    if let Some(user) = &cli.user {
        config.session.user_id = user.clone();
    }
    if let Some(session) = &cli.session {
        config.session.session_id = Some(session.clone());
    }
    if let Some(project) = &cli.project {
        config.session.project_id = project.clone();
    }
    config.validate().context("invalid command-line overrides")?;
    Ok(config)
}

fn recall_filter(session: &ConversationSession, within: RecallScope) -> ScopeFilter {
    let scope = session.scope();
    let user = ScopeFilter::new().user(scope.user_id.clone());
    match within {
        RecallScope::Project => user.project(scope.project_id.clone()),
        RecallScope::Session => user.session(scope.session_id.clone()),
        RecallScope::User => user,
        RecallScope::Exact => ScopeFilter::for_scope(scope),
    }
}

async fn chat(session: &mut ConversationSession) -> anyhow::Result<()> {
    println!(
        "jarvis chat (project={}, session={}); /help for commands",
        session.scope().project_id,
        session.scope().session_id
    );
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut last_said = String::new();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let input = match parse_chat_input(&line) {
            Ok(Some(input)) => input,
            Ok(None) => continue,
            Err(err) => {
                println!("{err}");
                continue;
            }
        };
        match input {
            ChatInput::Say(text) => {
                let history = session
                    .project_history(&text)
                    .await
                    .context("recall failed")?;
                if history != NO_HISTORY {
                    println!("{history}");
                }
                session.remember_turn(TurnRole::Human, text.clone());
                last_said = text;
            }
            ChatInput::Command(command) => {
                if !run_command(session, command, &last_said).await? {
                    break;
                }
            }
        }
    }
    if !session.buffer().is_empty() {
        println!(
            "{} unpromoted turn(s) discarded",
            session.buffer().len()
        );
    }
    Ok(())
}

/// Execute one slash command. Returns false when the loop should end.
async fn run_command(
    session: &mut ConversationSession,
    command: SlashCommand,
    last_said: &str,
) -> anyhow::Result<bool> {
    match command {
        SlashCommand::Ai(text) => session.remember_turn(TurnRole::Ai, text),
        SlashCommand::Promote => match session.promote().await {
            Ok(count) => println!("promoted {count} turn(s)"),
            Err(err) if err.is_retryable() => println!("promotion paused, retry later: {err}"),
            Err(err) => bail!(err),
        },
        SlashCommand::Clear => {
            session.clear_buffer();
            println!("buffer cleared");
        }
        SlashCommand::Buffer => {
            let rendered = session.render_buffer();
            println!("{}", if rendered.is_empty() { "(empty)" } else { rendered.as_str() });
        }
        SlashCommand::Project(id) => {
            if session.set_scope(&id)? {
                println!("switched to project {id}; buffer cleared");
            } else {
                println!("already on project {id}");
            }
        }
        SlashCommand::History(query) => {
            let query = if query.is_empty() { last_said } else { query.as_str() };
            println!("{}", session.project_history(query).await?);
        }
        SlashCommand::SessionHistory(query) => {
            let query = if query.is_empty() { last_said } else { query.as_str() };
            println!("{}", session.session_history(query).await?);
        }
        SlashCommand::Last => match session.last_ai_response() {
            Some(record) => println!("{}", record.text),
            None => println!("{NO_HISTORY}"),
        },
        SlashCommand::Help => println!("{HELP}"),
        SlashCommand::Quit => return Ok(false),
    }
    Ok(true)
}
