//! CLI command definitions and dispatch for the `rgate` binary.
//!
//! Uses clap derive macros for argument parsing. Commands are grouped by the
//! resource they touch (e.g., `rgate secret show`, `rgate client list`).

pub mod admit;
pub mod authorize;
pub mod client;
pub mod rotate;
pub mod secret;
pub mod token;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Token authorizer, secret rotator and webhook gate for automation services.
#[derive(Parser)]
#[command(name = "rgate", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Data directory holding config.toml and relaygate.db.
    #[arg(long, global = true, env = "RELAYGATE_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Keep all state in memory instead of SQLite.
    #[arg(long, global = true)]
    pub in_memory: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the REST API server.
    Serve {
        /// Port to listen on.
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Export spans through OpenTelemetry (stdout exporter).
        #[arg(long)]
        otel: bool,
    },

    /// Check a bearer token and print the resulting policy.
    Authorize {
        /// Token, with or without the `Bearer ` prefix.
        token: String,

        /// Resource the policy should cover.
        #[arg(long, default_value = "*")]
        resource: String,
    },

    /// Run a full rotation (create, set, test, finish) of the configured secret.
    Rotate {
        /// Secret to rotate instead of rotation.secret_id.
        #[arg(long)]
        secret_id: Option<String>,
    },

    /// Run a single rotation step, as a scheduler would.
    #[command(name = "rotate-step")]
    RotateStep {
        /// Secret identifier.
        #[arg(long)]
        secret_id: String,

        /// Version id shared by all steps of one rotation.
        #[arg(long)]
        token: String,

        /// createSecret, setSecret, testSecret or finishSecret.
        step: String,
    },

    /// Issue tokens signed with the current secret.
    Token {
        #[command(subcommand)]
        action: TokenCommand,
    },

    /// Inspect or seed the signing secret.
    Secret {
        #[command(subcommand)]
        action: SecretCommand,
    },

    /// Manage client records used by webhook admission.
    Client {
        #[command(subcommand)]
        action: ClientCommand,
    },

    /// Run a webhook envelope from a file through admission.
    Admit {
        /// JSON file with the webhook body (`-` for stdin).
        file: PathBuf,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum TokenCommand {
    /// Sign a token with the CURRENT secret.
    Issue {
        /// Subject claim.
        #[arg(long, default_value = "automation")]
        sub: String,

        /// Lifetime in seconds.
        #[arg(long, default_value = "3600")]
        ttl: i64,

        /// Workflow id forwarded to downstream handlers.
        #[arg(long)]
        workflow_id: Option<String>,

        /// Execution id forwarded to downstream handlers.
        #[arg(long)]
        execution_id: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum SecretCommand {
    /// Show versions and stages of the secret (values masked).
    Show {
        /// Secret to show instead of the configured one.
        #[arg(long)]
        secret_id: Option<String>,
    },

    /// Store an initial CURRENT version.
    Seed {
        /// Secret to seed instead of the configured one.
        #[arg(long)]
        secret_id: Option<String>,

        /// Secret value (prompted when omitted).
        #[arg(long)]
        value: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ClientCommand {
    /// Create or update a client bound to a task.
    Register {
        /// Client id.
        id: String,

        /// Display name.
        #[arg(long)]
        name: String,

        /// Task whose status changes belong to this client.
        #[arg(long)]
        task: String,

        /// Workflow id per automation, as key=value (repeatable).
        #[arg(long = "workflow", value_parser = parse_key_value)]
        workflows: Vec<(String, String)>,
    },

    /// List registered clients.
    List,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    if key.trim().is_empty() {
        return Err(format!("empty key in '{raw}'"));
    }
    Ok((key.trim().to_string(), value.trim().to_string()))
}
