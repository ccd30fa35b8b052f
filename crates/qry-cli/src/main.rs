//! qry CLI - shared ecosystem store for the qry tools

use std::io::Read;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use clap::{Parser, Subcommand};
use qry_core::extensions::wherewasi::{ContextGenerator, GeneratedContext};
use qry_core::models::UsageEvent;
use qry_core::{Config, Database, Messenger, ToolName};
use serde::Serialize;

#[derive(Debug, Parser)]
#[command(
    name = "qry",
    author,
    version,
    about = "Shared ecosystem store for the qry tools",
    propagate_version = true
)]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Act as this tool (selects the extension schema and message inbox)
    #[arg(long, global = true, env = "QRY_TOOL")]
    tool: Option<String>,

    /// Open this database file, skipping discovery
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Never use the shared ecosystem store
    #[arg(long, global = true)]
    local: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show which store is in use and what it holds
    Status,

    /// List recently active projects
    Projects {
        /// Maximum results
        #[arg(short, long, default_value = "10")]
        limit: i64,
    },

    /// Record activity on a project
    Track {
        /// Project name (defaults to the current directory name)
        name: Option<String>,

        /// Project path (defaults to the current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },

    /// Save a context session; the context text is read from stdin
    Save {
        /// Project name
        project: String,

        /// Short session summary
        #[arg(long, default_value = "")]
        info: String,

        /// Comma-separated keywords
        #[arg(long, default_value = "")]
        keywords: String,

        /// Git branch the context belongs to
        #[arg(long)]
        branch: Option<String>,
    },

    /// Show the latest context sessions of a project
    Recent {
        /// Project name
        project: String,

        /// Maximum results
        #[arg(short, long, default_value = "5")]
        limit: i64,
    },

    /// Search stored context sessions
    Search {
        /// Keyword to look for
        keyword: String,
    },

    /// Send a message to another tool
    Send {
        /// Recipient tool
        to: String,

        /// Message type
        #[arg(long = "type", default_value = "alert")]
        message_type: String,

        /// JSON payload
        #[arg(long, default_value = "{}")]
        data: String,
    },

    /// Show unprocessed messages addressed to this tool
    Inbox {
        /// Mark every shown message as processed
        #[arg(long)]
        ack: bool,
    },

    /// Mark a message as processed
    Ack {
        /// Message ID
        id: i64,
    },

    /// Show pending insights for this tool
    Insights,

    /// Show recent command usage for this tool
    Usage {
        /// Maximum results
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },

    /// List applied schema migrations
    Migrations,
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Status => "status",
            Command::Projects { .. } => "projects",
            Command::Track { .. } => "track",
            Command::Save { .. } => "save",
            Command::Recent { .. } => "recent",
            Command::Search { .. } => "search",
            Command::Send { .. } => "send",
            Command::Inbox { .. } => "inbox",
            Command::Ack { .. } => "ack",
            Command::Insights => "insights",
            Command::Usage { .. } => "usage",
            Command::Migrations => "migrations",
        }
    }

    fn project(&self) -> Option<String> {
        match self {
            Command::Track { name, .. } => name.clone(),
            Command::Save { project, .. } | Command::Recent { project, .. } => {
                Some(project.clone())
            }
            _ => None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // RUST_LOG wins over -v
    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Load config
    let config_path = cli.config.clone().unwrap_or_else(Config::default_config_path);
    let mut config = Config::load_at(&config_path)?;
    if let Some(tool) = &cli.tool {
        config.tool.clone_from(tool);
    }
    if let Some(database) = &cli.database {
        config.database = Some(database.clone());
    }
    config.force_local |= cli.local;

    // Open database
    let db = Database::connect(&config.connect_options()).await?;

    let started = Instant::now();
    let command_name = cli.command.name();
    let project = cli.command.project();
    let result = run(&db, &config, cli.json, cli.command).await;

    let event = UsageEvent {
        tool: config.tool.clone(),
        command: command_name.to_string(),
        project,
        session_id: Some(uuid::Uuid::new_v4().to_string()),
        duration_ms: i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX),
        success: result.is_ok(),
        error_message: result.as_ref().err().map(ToString::to_string),
    };
    if let Err(err) = db.track_usage(&event).await {
        tracing::warn!("failed to record usage: {err}");
    }

    db.close().await;
    result
}

async fn run(db: &Database, config: &Config, json: bool, command: Command) -> Result<()> {
    match command {
        Command::Status => cmd_status(db, config, json).await,
        Command::Projects { limit } => cmd_projects(db, limit, json).await,
        Command::Track { name, path } => cmd_track(db, config, name, path).await,
        Command::Save {
            project,
            info,
            keywords,
            branch,
        } => {
            let generator = StdinContext {
                info,
                keywords,
                branch,
            };
            cmd_save(db, &project, &generator).await
        }
        Command::Recent { project, limit } => cmd_recent(db, &project, limit, json).await,
        Command::Search { keyword } => cmd_search(db, &keyword, json).await,
        Command::Send {
            to,
            message_type,
            data,
        } => cmd_send(db, config, &to, &message_type, &data).await,
        Command::Inbox { ack } => cmd_inbox(db, config, ack, json).await,
        Command::Ack { id } => {
            Messenger::new(db).mark_processed(id).await?;
            println!("Marked message {id} as processed.");
            Ok(())
        }
        Command::Insights => cmd_insights(db, config, json).await,
        Command::Usage { limit } => cmd_usage(db, config, limit, json).await,
        Command::Migrations => cmd_migrations(db, json).await,
    }
}

/// Context text piped in by the calling tool.
struct StdinContext {
    info: String,
    keywords: String,
    branch: Option<String>,
}

impl ContextGenerator for StdinContext {
    fn generate(&self, _project: &str) -> qry_core::Result<GeneratedContext> {
        let mut context_data = String::new();
        std::io::stdin().read_to_string(&mut context_data)?;
        if context_data.trim().is_empty() {
            return Err(qry_core::Error::Validation(
                "no context text on stdin".to_string(),
            ));
        }
        Ok(GeneratedContext {
            context_data,
            session_info: self.info.clone(),
            keywords: self.keywords.clone(),
            git_branch: self.branch.clone(),
            git_commit: None,
        })
    }
}

#[derive(Serialize)]
struct Status<'a> {
    tool: &'a str,
    database: String,
    shared: bool,
    schema_versions: Vec<i64>,
    projects: usize,
    unprocessed_messages: usize,
}

async fn cmd_status(db: &Database, config: &Config, json: bool) -> Result<()> {
    let migrations = db.applied_migrations().await?;
    let projects = db.get_recent_projects(1_000).await?;
    let inbox = match config.tool.parse::<ToolName>() {
        Ok(_) => Messenger::new(db).drain(&config.tool).await?.len(),
        Err(_) => 0,
    };

    let status = Status {
        tool: &config.tool,
        database: db.path().display().to_string(),
        shared: db.is_shared(),
        schema_versions: migrations.iter().map(|m| m.version).collect(),
        projects: projects.len(),
        unprocessed_messages: inbox,
    };

    if json {
        return print_json(&status);
    }

    println!("Ecosystem Status");
    println!("----------------");
    println!("Tool:      {}", status.tool);
    println!(
        "Database:  {} ({})",
        status.database,
        if status.shared { "shared" } else { "private" }
    );
    println!("Schema:    {:?}", status.schema_versions);
    println!("Projects:  {}", status.projects);
    println!("Inbox:     {}", status.unprocessed_messages);
    Ok(())
}

async fn cmd_projects(db: &Database, limit: i64, json: bool) -> Result<()> {
    let projects = db.get_recent_projects(limit).await?;
    if json {
        return print_json(&projects);
    }
    if projects.is_empty() {
        println!("No projects tracked.");
        return Ok(());
    }

    for project in projects {
        let when = project
            .last_activity
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{} | {} | {} | {}",
            project.name,
            when,
            project.primary_tool.as_deref().unwrap_or("-"),
            project.path.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

async fn cmd_track(
    db: &Database,
    config: &Config,
    name: Option<String>,
    path: Option<PathBuf>,
) -> Result<()> {
    let path = match path {
        Some(path) => path,
        None => std::env::current_dir()?,
    };
    let name = name.map_or_else(
        || qry_core::db::project_name_from_path(&path),
        |n| qry_core::db::sanitize_project_name(&n),
    );
    let is_git_repo = path.join(".git").exists();

    db.track_project(&name, &path.to_string_lossy(), &config.tool, is_git_repo)
        .await?;
    println!("Tracked project: {name}");
    Ok(())
}

async fn cmd_save<G: ContextGenerator>(db: &Database, project: &str, generator: &G) -> Result<()> {
    let session = db.save_generated_context(project, generator).await?;
    println!("Saved context {} for {}", session.id, session.project);
    Ok(())
}

async fn cmd_recent(db: &Database, project: &str, limit: i64, json: bool) -> Result<()> {
    let sessions = db.get_recent_contexts(project, limit).await?;
    if json {
        return print_json(&sessions);
    }
    if sessions.is_empty() {
        println!("No context saved for {project}.");
        return Ok(());
    }

    for session in sessions {
        println!(
            "--- {} | {} ---",
            session.id,
            session.timestamp.format("%Y-%m-%d %H:%M")
        );
        if !session.session_info.is_empty() {
            println!("{}", session.session_info);
        }
        println!("{}", session.context_data);
        println!();
    }
    Ok(())
}

async fn cmd_search(db: &Database, keyword: &str, json: bool) -> Result<()> {
    let sessions = db.search_stored_contexts(keyword).await?;
    if json {
        return print_json(&sessions);
    }
    if sessions.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    for session in sessions {
        println!(
            "[{} #{} | {}] {}",
            session.project,
            session.id,
            session.timestamp.format("%Y-%m-%d %H:%M"),
            truncate(&session.context_data, 120)
        );
    }
    Ok(())
}

async fn cmd_send(
    db: &Database,
    config: &Config,
    to: &str,
    message_type: &str,
    data: &str,
) -> Result<()> {
    let id = Messenger::new(db)
        .send(&config.tool, to, message_type, data)
        .await?;
    println!("Sent message {id} to {to}");
    Ok(())
}

async fn cmd_inbox(db: &Database, config: &Config, ack: bool, json: bool) -> Result<()> {
    let messenger = Messenger::new(db);
    let messages = messenger.drain(&config.tool).await?;

    if json {
        print_json(&messages)?;
    } else if messages.is_empty() {
        println!("No unprocessed messages for {}.", config.tool);
    } else {
        for msg in &messages {
            println!(
                "{} | {} | {} -> {} | {} | {}",
                msg.id,
                msg.created_at.format("%Y-%m-%d %H:%M:%S"),
                msg.from_tool,
                msg.to_tool,
                msg.message_type,
                truncate(&msg.data, 80)
            );
        }
    }

    if ack {
        for msg in &messages {
            messenger.mark_processed(msg.id).await?;
        }
        tracing::info!(count = messages.len(), "acknowledged messages");
    }
    Ok(())
}

async fn cmd_insights(db: &Database, config: &Config, json: bool) -> Result<()> {
    let target = config.tool.parse::<ToolName>()?;
    let insights = db.pending_insights(target).await?;
    if json {
        return print_json(&insights);
    }
    if insights.is_empty() {
        println!("No pending insights.");
        return Ok(());
    }

    for insight in insights {
        println!(
            "{} | {:.2} | {} from {} | {}",
            insight.id,
            insight.confidence,
            insight.insight_type,
            insight.source_tool,
            insight.project.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

async fn cmd_usage(db: &Database, config: &Config, limit: i64, json: bool) -> Result<()> {
    let usage = db.recent_usage(&config.tool, limit).await?;
    if json {
        return print_json(&usage);
    }

    for stat in usage {
        let outcome = if stat.success { "ok" } else { "failed" };
        println!(
            "{} | {} | {} | {}ms",
            stat.created_at.format("%Y-%m-%d %H:%M:%S"),
            stat.command,
            outcome,
            stat.duration_ms.unwrap_or(0)
        );
    }
    Ok(())
}

async fn cmd_migrations(db: &Database, json: bool) -> Result<()> {
    let migrations = db.applied_migrations().await?;
    if json {
        return print_json(&migrations);
    }

    for m in migrations {
        println!(
            "{:>3} | {} | {} | {}",
            m.version,
            m.tool,
            m.applied_at.format("%Y-%m-%d %H:%M"),
            m.description
        );
    }
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn truncate(s: &str, max_len: usize) -> String {
    let s = s.replace('\n', " ");
    if s.chars().count() <= max_len {
        s
    } else {
        let cut: String = s.chars().take(max_len).collect();
        format!("{cut}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo\nworld", 5), "héllo...");
        assert_eq!(truncate("short", 10), "short");
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from(["qry", "inbox", "--ack", "--tool", "uroboro", "--local"])
            .expect("parse");
        assert_eq!(cli.tool.as_deref(), Some("uroboro"));
        assert!(cli.local);
        assert!(matches!(cli.command, Command::Inbox { ack: true }));
    }

    #[test]
    fn usage_names_follow_commands() {
        let cli = Cli::try_parse_from(["qry", "save", "demo", "--info", "wip"]).expect("parse");
        assert_eq!(cli.command.name(), "save");
        assert_eq!(cli.command.project().as_deref(), Some("demo"));
    }
}
