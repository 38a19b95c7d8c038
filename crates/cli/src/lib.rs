use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

mod commands;
mod output;

use parley_core::Hub;
use parley_core::adapters::fs as fsutil;

/// Parley - lock manager and reliable messaging for agent fleets
/// coordinating through a shared workspace.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
  /// Project root (defaults to the current directory)
  #[arg(long, global = true, value_name = "DIR")]
  root: Option<PathBuf>,
  #[command(subcommand)]
  command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
  /// Create the .parley layout and a commented default config
  Init,
  /// Register an agent's delivery target (a tmux pane like `work:1.0`)
  Register { agent: String, target: String },
  /// Remove an agent from the registry
  Unregister { agent: String },
  /// List registered agents
  Agents,
  /// Claim, release, and inspect resource locks
  #[command(subcommand)]
  Lock(LockCommands),
  /// Send a direct message to one agent
  Send {
    sender: String,
    recipient: String,
    content: String,
    /// question, review-request, blocked, completed, challenge, info or ack
    #[arg(long = "type", default_value = "info", value_name = "TYPE")]
    msg_type: String,
    /// Track the message until someone acknowledges it
    #[arg(long)]
    ack: bool,
    /// Seconds before the first retry of a tracked send
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,
  },
  /// Broadcast a message to every registered agent
  Broadcast {
    sender: String,
    content: String,
    /// question, review-request, blocked, completed, challenge, info or ack
    #[arg(long = "type", default_value = "info", value_name = "TYPE")]
    msg_type: String,
    /// Deliver to the sender as well
    #[arg(long)]
    include_self: bool,
  },
  /// Acknowledge a message by id
  Ack {
    msg_id: String,
    /// Agent confirming the message
    #[arg(long, default_value = "unknown")]
    from: String,
  },
  /// Resend due unacknowledged messages and escalate exhausted ones
  Retries,
  /// Show messages still waiting for acknowledgment
  Pending,
}

#[derive(Debug, Subcommand)]
pub(crate) enum LockCommands {
  /// Claim exclusive ownership of a resource name or glob
  Acquire {
    resource: String,
    agent: String,
    #[arg(long, default_value = "")]
    reason: String,
  },
  /// Release a lock you hold
  Release { resource: String, agent: String },
  /// Show who currently holds a resource
  Who { resource: String },
  /// List current locks
  List {
    /// Include stale records instead of purging them
    #[arg(long)]
    stale: bool,
  },
  /// Purge stale locks, or everything a given agent left behind
  Cleanup {
    #[arg(long)]
    agent: Option<String>,
  },
}

pub fn run() -> Result<()> {
  let cli = Cli::parse();
  let root = match cli.root {
    Some(root) => root,
    None => std::env::current_dir().context("resolve current directory")?,
  };

  if matches!(cli.command, Commands::Init) {
    return commands::init::run(&root);
  }

  let hub = Hub::open(&root)?;
  parley_core::logging::init(&fsutil::logs_path(&root), hub.config.log_level);

  match cli.command {
    Commands::Init => Ok(()),
    Commands::Register { agent, target } => commands::agents::register(&hub, &agent, &target),
    Commands::Unregister { agent } => commands::agents::unregister(&hub, &agent),
    Commands::Agents => commands::agents::list(&hub),
    Commands::Lock(cmd) => commands::lock::run(&hub, cmd),
    Commands::Send {
      sender,
      recipient,
      content,
      msg_type,
      ack,
      timeout,
    } => commands::send::direct(&hub, &sender, &recipient, &msg_type, &content, ack, timeout),
    Commands::Broadcast {
      sender,
      content,
      msg_type,
      include_self,
    } => commands::send::broadcast(&hub, &sender, &msg_type, &content, include_self),
    Commands::Ack { msg_id, from } => commands::ack::receive(&hub, &msg_id, &from),
    Commands::Retries => commands::ack::retries(&hub),
    Commands::Pending => commands::ack::pending(&hub),
  }
}
