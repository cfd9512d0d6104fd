//! Command-line arguments

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use taskdesk_shared::models::task::{TaskPriority, TaskStatus};
use taskdesk_shared::models::user::Role;
use taskdesk_shared::models::wire::parse_datetime;

/// CLI arguments structure
#[derive(Parser, Debug)]
#[command(name = "taskdesk")]
#[command(author, version, about = "Command-line client for the TaskDesk API", long_about = None)]
pub struct Cli {
    /// Path to a configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// API URL (overrides TASKDESK_API_URL and the config file)
    #[arg(long)]
    pub api_url: Option<String>,

    /// Session file (default: ~/.taskdesk/session.json)
    #[arg(long)]
    pub session_file: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in and store the session
    Login {
        #[arg(short, long)]
        username: String,

        /// Password (read from stdin when omitted)
        #[arg(short, long, env = "TASKDESK_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Create an account and log in with it
    Register {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        email: String,

        /// Password (read from stdin when omitted)
        #[arg(short, long, env = "TASKDESK_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        #[arg(long, default_value = "")]
        first_name: String,

        #[arg(long, default_value = "")]
        last_name: String,
    },

    /// Forget the stored session
    Logout,

    /// Show the logged-in user
    Whoami,

    /// Show configuration and session status
    Status,

    /// User management commands
    #[command(subcommand)]
    Users(UsersCommands),

    /// Task commands
    #[command(subcommand)]
    Tasks(TasksCommands),

    /// Tenant commands
    #[command(subcommand)]
    Tenants(TenantsCommands),
}

/// Users subcommands
#[derive(Subcommand, Debug)]
pub enum UsersCommands {
    /// List users
    List {
        /// Match username or email
        #[arg(short, long)]
        search: Option<String>,

        #[arg(short, long)]
        role: Option<Role>,
    },

    /// Show one user
    Show { id: i64 },

    /// Create a user
    Create {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        email: String,

        /// Password (read from stdin when omitted)
        #[arg(short, long, env = "TASKDESK_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        #[arg(short, long)]
        role: Option<Role>,

        #[arg(long, default_value = "")]
        first_name: String,

        #[arg(long, default_value = "")]
        last_name: String,
    },

    /// Update a user
    Update {
        id: i64,

        #[arg(long)]
        username: Option<String>,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        first_name: Option<String>,

        #[arg(long)]
        last_name: Option<String>,

        #[arg(long)]
        role: Option<Role>,
    },

    /// Delete a user
    Delete { id: i64 },

    /// Change your password
    Passwd {
        #[arg(long)]
        current: String,

        #[arg(long)]
        new: String,
    },
}

/// Tasks subcommands
#[derive(Subcommand, Debug)]
pub enum TasksCommands {
    /// List tasks
    List {
        #[arg(short, long)]
        status: Option<TaskStatus>,

        #[arg(short, long)]
        priority: Option<TaskPriority>,

        /// Assignee user ID
        #[arg(short, long)]
        assignee: Option<i64>,

        /// Match title or description
        #[arg(long)]
        search: Option<String>,

        /// Due before (RFC 3339 or YYYY-MM-DD)
        #[arg(long, value_parser = parse_due)]
        due_before: Option<DateTime<Utc>>,

        /// Due after (RFC 3339 or YYYY-MM-DD)
        #[arg(long, value_parser = parse_due)]
        due_after: Option<DateTime<Utc>>,
    },

    /// Show one task with comments and attachments
    Show { id: i64 },

    /// Create a task
    Create {
        title: String,

        #[command(flatten)]
        fields: TaskFields,
    },

    /// Update a task
    Update {
        id: i64,

        #[arg(long)]
        title: Option<String>,

        #[command(flatten)]
        fields: TaskFields,
    },

    /// Delete a task
    Delete { id: i64 },

    /// Add a comment
    Comment {
        id: i64,

        content: String,

        /// Comment being replied to
        #[arg(long)]
        reply_to: Option<i64>,
    },

    /// List comments
    Comments { id: i64 },

    /// Upload a file
    Attach {
        id: i64,

        file: PathBuf,

        #[arg(short, long, default_value = "")]
        description: String,
    },

    /// List attachments
    Attachments { id: i64 },
}

/// Optional task fields shared by create and update
#[derive(Args, Debug, Default)]
pub struct TaskFields {
    #[arg(short, long)]
    pub description: Option<String>,

    #[arg(short, long)]
    pub status: Option<TaskStatus>,

    #[arg(short, long)]
    pub priority: Option<TaskPriority>,

    /// Due date (RFC 3339 or YYYY-MM-DD)
    #[arg(long, value_parser = parse_due)]
    pub due: Option<DateTime<Utc>>,

    /// Assignee user ID
    #[arg(short, long)]
    pub assign: Option<i64>,
}

/// Tenants subcommands
#[derive(Subcommand, Debug)]
pub enum TenantsCommands {
    /// List tenants
    List,

    /// Show one tenant
    Show { id: i64 },
}

fn parse_due(value: &str) -> Result<DateTime<Utc>, String> {
    parse_datetime(value).ok_or_else(|| format!("invalid date: {} (expected YYYY-MM-DD or RFC 3339)", value))
}
