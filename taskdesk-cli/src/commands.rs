//! CLI command handlers

use anyhow::{bail, Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use taskdesk_client::api::NewAttachment;
use taskdesk_client::config::ClientConfig;
use taskdesk_client::{jwt, SessionEvent, TaskDeskClient};
use taskdesk_shared::models::auth::Credentials;
use taskdesk_shared::models::task::{
    Attachment, Comment, CreateTask, NewComment, Task, TaskFilter, UpdateTask,
};
use taskdesk_shared::models::tenant::Tenant;
use taskdesk_shared::models::user::{ChangePassword, CreateUser, UpdateUser, User, UserFilter};
use tokio::sync::broadcast;

use crate::cli::{Cli, Commands, TaskFields, TasksCommands, TenantsCommands, UsersCommands};

/// Session file used when neither the flag nor the configuration names one
pub fn default_session_file() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".taskdesk").join("session.json"))
}

/// Resolves configuration with command-line overrides applied
pub fn resolve_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config =
        ClientConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    if let Some(url) = &cli.api_url {
        config.api.base_url = url.clone();
    }

    config.session.file = cli
        .session_file
        .clone()
        .or(config.session.file)
        .or_else(default_session_file);

    config.validate()?;
    Ok(config)
}

/// Run a CLI command
pub async fn run_command(cli: &Cli) -> Result<()> {
    let config = resolve_config(cli)?;
    let client = TaskDeskClient::from_config(&config).context("Failed to create client")?;
    let mut events = client.auth().events();

    let result = match &cli.command {
        Commands::Login { username, password } => {
            cmd_login(cli, &client, username, password.as_deref()).await
        }
        Commands::Register {
            username,
            email,
            password,
            first_name,
            last_name,
        } => {
            let data = CreateUser {
                username: username.clone(),
                email: email.clone(),
                password: password_or_prompt(password.as_deref())?,
                first_name: first_name.clone(),
                last_name: last_name.clone(),
                role: None,
            };
            cmd_register(cli, &client, &data).await
        }
        Commands::Logout => cmd_logout(&client).await,
        Commands::Whoami => cmd_whoami(cli, &client).await,
        Commands::Status => cmd_status(&config, &client),
        Commands::Users(command) => run_users(cli, &client, command).await,
        Commands::Tasks(command) => run_tasks(cli, &client, command).await,
        Commands::Tenants(command) => run_tenants(cli, &client, command).await,
    };

    report_session_events(&mut events);
    result
}

/// Surfaces session changes that happened while the command ran
fn report_session_events(events: &mut broadcast::Receiver<SessionEvent>) {
    while let Ok(event) = events.try_recv() {
        let redirect = event.redirect().map(|route| route.path());
        tracing::debug!(?event, ?redirect, "Session event");

        if event == SessionEvent::Expired {
            eprintln!("Session expired. Run `taskdesk login` to sign in again.");
        }
    }
}

fn password_or_prompt(password: Option<&str>) -> Result<String> {
    if let Some(password) = password {
        return Ok(password.to_string());
    }

    eprint!("Password: ");
    io::stderr().flush().ok();

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read password from stdin")?;

    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        bail!("A password is required");
    }
    Ok(password)
}

/// Prints `value` as JSON or through the human-readable printer
fn output<T: Serialize>(cli: &Cli, value: &T, human: impl FnOnce(&T)) -> Result<()> {
    if cli.json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        human(value);
    }
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

fn or_dash<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

// ============================================================================
// Session
// ============================================================================

async fn cmd_login(
    cli: &Cli,
    client: &TaskDeskClient,
    username: &str,
    password: Option<&str>,
) -> Result<()> {
    let credentials = Credentials::new(username, password_or_prompt(password)?);
    let user = client.auth().login(&credentials).await?;

    output(cli, &user, |user| {
        println!("Logged in as {} ({})", user.display_name(), user.role);
    })
}

async fn cmd_register(cli: &Cli, client: &TaskDeskClient, data: &CreateUser) -> Result<()> {
    let user = client.auth().register(data).await?;

    output(cli, &user, |user| {
        println!("Registered and logged in as {}", user.username);
    })
}

async fn cmd_logout(client: &TaskDeskClient) -> Result<()> {
    client.auth().logout().await?;
    println!("Logged out.");
    Ok(())
}

async fn cmd_whoami(cli: &Cli, client: &TaskDeskClient) -> Result<()> {
    if !client.session().has_session() {
        bail!("Not logged in. Run `taskdesk login` first.");
    }

    let user = client.auth().reload_current_user().await?;
    output(cli, &user, print_user)
}

fn cmd_status(config: &ClientConfig, client: &TaskDeskClient) -> Result<()> {
    let session_file = config
        .session
        .file
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(memory)".to_string());

    println!();
    println!("=== TaskDesk Client Status ===");
    println!();
    println!("Version:      v{}", taskdesk_client::VERSION);
    println!("API URL:      {}", config.api.base_url);
    println!("Timeout:      {}s", config.api.timeout_secs);
    println!("Vocabulary:   {:?}", config.api.status_vocabulary);
    println!("Session file: {}", session_file);

    match client.session().access_token() {
        Some(token) => {
            let now = Utc::now();
            let expiry = match jwt::expires_at(&token) {
                Some(at) if at <= now => format!("expired at {}", at.to_rfc3339()),
                Some(at) => format!("valid until {}", at.to_rfc3339()),
                None => "unknown expiry".to_string(),
            };
            println!("Session:      stored ({})", expiry);
        }
        None => println!("Session:      none"),
    }
    println!();

    Ok(())
}

// ============================================================================
// Users
// ============================================================================

async fn run_users(cli: &Cli, client: &TaskDeskClient, command: &UsersCommands) -> Result<()> {
    match command {
        UsersCommands::List { search, role } => {
            let filter = UserFilter {
                search: search.clone(),
                role: *role,
            };
            let users = client.users().list(&filter).await?;
            output(cli, &users, |users| print_user_table(users))
        }
        UsersCommands::Show { id } => {
            let user = client.users().get(*id).await?;
            output(cli, &user, print_user)
        }
        UsersCommands::Create {
            username,
            email,
            password,
            role,
            first_name,
            last_name,
        } => {
            require_user_manager(client).await?;
            let data = CreateUser {
                username: username.clone(),
                email: email.clone(),
                password: password_or_prompt(password.as_deref())?,
                first_name: first_name.clone(),
                last_name: last_name.clone(),
                role: *role,
            };
            let user = client.users().create(&data).await?;
            output(cli, &user, |user| println!("Created user {} (ID {})", user.username, user.id))
        }
        UsersCommands::Update {
            id,
            username,
            email,
            first_name,
            last_name,
            role,
        } => {
            let changes = UpdateUser {
                username: username.clone(),
                email: email.clone(),
                first_name: first_name.clone(),
                last_name: last_name.clone(),
                role: *role,
            };
            if changes.is_empty() {
                bail!("Nothing to update");
            }
            let user = client.users().update(*id, &changes).await?;
            output(cli, &user, print_user)
        }
        UsersCommands::Delete { id } => {
            require_user_manager(client).await?;
            client.users().delete(*id).await?;
            println!("Deleted user {}", id);
            Ok(())
        }
        UsersCommands::Passwd { current, new } => {
            let change = ChangePassword {
                current_password: current.clone(),
                new_password: new.clone(),
            };
            client.users().change_password(&change).await?;
            println!("Password changed.");
            Ok(())
        }
    }
}

/// Fails early when the logged-in user may not manage other users
async fn require_user_manager(client: &TaskDeskClient) -> Result<()> {
    let me = match client.auth().current_user() {
        Some(user) => user,
        None => client.auth().reload_current_user().await?,
    };
    ensure_can_manage(&me)
}

fn ensure_can_manage(user: &User) -> Result<()> {
    if !user.role.can_manage_users() {
        bail!(
            "{} has role '{}' and cannot create or delete users",
            user.username,
            user.role
        );
    }
    Ok(())
}

fn print_user(user: &User) {
    println!();
    println!("=== User: {} ===", user.username);
    println!();
    println!("ID:       {}", user.id);
    println!("Name:     {}", user.display_name());
    println!("Email:    {}", user.email);
    println!("Role:     {}", user.role);
    println!("Tenant:   {}", or_dash(user.tenant_id));
    println!();
}

fn print_user_table(users: &[User]) {
    if users.is_empty() {
        println!("No users found.");
        return;
    }

    println!();
    println!("{:<6}  {:<20}  {:<30}  {:<8}", "ID", "USERNAME", "EMAIL", "ROLE");
    println!("{}", "-".repeat(70));
    for user in users {
        println!(
            "{:<6}  {:<20}  {:<30}  {:<8}",
            user.id,
            truncate(&user.username, 20),
            truncate(&user.email, 30),
            user.role
        );
    }
    println!();
}

// ============================================================================
// Tasks
// ============================================================================

async fn run_tasks(cli: &Cli, client: &TaskDeskClient, command: &TasksCommands) -> Result<()> {
    match command {
        TasksCommands::List {
            status,
            priority,
            assignee,
            search,
            due_before,
            due_after,
        } => {
            let filter = TaskFilter {
                status: *status,
                priority: *priority,
                assigned_to: *assignee,
                search: search.clone(),
                due_before: *due_before,
                due_after: *due_after,
            };
            let tasks = client.tasks().list(&filter).await?;
            output(cli, &tasks, |tasks| print_task_table(tasks))
        }
        TasksCommands::Show { id } => {
            let task = client.tasks().get(*id).await?;
            output(cli, &task, print_task)
        }
        TasksCommands::Create { title, fields } => {
            let data = CreateTask {
                title: title.clone(),
                description: fields.description.clone().unwrap_or_default(),
                status: fields.status,
                priority: fields.priority,
                due_date: fields.due,
                assigned_to: fields.assign,
                parent_task: None,
            };
            let task = client.tasks().create(&data).await?;
            output(cli, &task, |task| println!("Created task {} (ID {})", task.title, task.id))
        }
        TasksCommands::Update { id, title, fields } => {
            let changes = update_from(title.clone(), fields);
            if changes.is_empty() {
                bail!("Nothing to update");
            }
            let task = client.tasks().update(*id, &changes).await?;
            output(cli, &task, print_task)
        }
        TasksCommands::Delete { id } => {
            client.tasks().delete(*id).await?;
            println!("Deleted task {}", id);
            Ok(())
        }
        TasksCommands::Comment {
            id,
            content,
            reply_to,
        } => {
            let comment = NewComment {
                content: content.clone(),
                parent: *reply_to,
            };
            let comment = client.tasks().add_comment(*id, &comment).await?;
            output(cli, &comment, |c| println!("Added comment {} to task {}", c.id, id))
        }
        TasksCommands::Comments { id } => {
            let comments = client.tasks().comments(*id).await?;
            output(cli, &comments, |comments| print_comments(comments))
        }
        TasksCommands::Attach {
            id,
            file,
            description,
        } => {
            let attachment = NewAttachment::from_path(file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?
                .with_description(description.clone());
            let attachment = client.tasks().add_attachment(*id, attachment).await?;
            output(cli, &attachment, |a| {
                println!("Uploaded {} to task {}", a.file_name(), id)
            })
        }
        TasksCommands::Attachments { id } => {
            let attachments = client.tasks().attachments(*id).await?;
            output(cli, &attachments, |attachments| print_attachments(attachments))
        }
    }
}

fn update_from(title: Option<String>, fields: &TaskFields) -> UpdateTask {
    UpdateTask {
        title,
        description: fields.description.clone(),
        status: fields.status,
        priority: fields.priority,
        due_date: fields.due,
        assigned_to: fields.assign,
    }
}

fn print_task(task: &Task) {
    let now = Utc::now();

    println!();
    println!("=== Task {}: {} ===", task.id, task.title);
    println!();
    println!("Status:      {}", task.status);
    println!("Priority:    {}", task.priority);
    match task.due_date {
        Some(due) if task.is_overdue(now) => println!("Due:         {} (overdue)", due.to_rfc3339()),
        Some(due) => println!("Due:         {}", due.to_rfc3339()),
        None => println!("Due:         -"),
    }
    println!("Assignee:    {}", or_dash(task.assigned_to));
    println!("Created by:  {}", or_dash(task.created_by));
    println!("Created:     {}", task.created_at.to_rfc3339());
    println!("Updated:     {}", task.updated_at.to_rfc3339());
    if !task.description.is_empty() {
        println!();
        println!("{}", task.description);
    }

    if !task.comments.is_empty() {
        println!();
        println!("Comments:");
        print_comments(&task.comments);
    }
    if !task.attachments.is_empty() {
        println!();
        println!("Attachments:");
        print_attachments(&task.attachments);
    }
    println!();
}

fn print_task_table(tasks: &[Task]) {
    if tasks.is_empty() {
        println!("No tasks found.");
        return;
    }

    println!();
    println!(
        "{:<6}  {:<40}  {:<12}  {:<8}  {:<10}",
        "ID", "TITLE", "STATUS", "PRIORITY", "DUE"
    );
    println!("{}", "-".repeat(84));
    for task in tasks {
        let due = task
            .due_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<6}  {:<40}  {:<12}  {:<8}  {:<10}",
            task.id,
            truncate(&task.title, 40),
            task.status,
            task.priority,
            due
        );
    }
    println!();
}

fn print_comments(comments: &[Comment]) {
    if comments.is_empty() {
        println!("No comments.");
        return;
    }

    for comment in comments {
        let reply = comment
            .parent_id
            .map(|parent| format!(" (reply to {})", parent))
            .unwrap_or_default();
        println!(
            "  [{}] {} by {}{}",
            comment.id,
            comment.created_at.format("%Y-%m-%d %H:%M"),
            or_dash(comment.author_id),
            reply
        );
        println!("      {}", comment.content);
    }
}

fn print_attachments(attachments: &[Attachment]) {
    if attachments.is_empty() {
        println!("No attachments.");
        return;
    }

    for attachment in attachments {
        let description = if attachment.description.is_empty() {
            String::new()
        } else {
            format!(" - {}", attachment.description)
        };
        println!(
            "  [{}] {}{} ({})",
            attachment.id,
            attachment.file_name(),
            description,
            attachment.uploaded_at.format("%Y-%m-%d %H:%M")
        );
    }
}

// ============================================================================
// Tenants
// ============================================================================

async fn run_tenants(cli: &Cli, client: &TaskDeskClient, command: &TenantsCommands) -> Result<()> {
    match command {
        TenantsCommands::List => {
            let tenants = client.tenants().list().await?;
            output(cli, &tenants, |tenants| print_tenant_table(tenants))
        }
        TenantsCommands::Show { id } => {
            let tenant = client.tenants().get(*id).await?;
            output(cli, &tenant, |tenant| print_tenant_table(std::slice::from_ref(tenant)))
        }
    }
}

fn print_tenant_table(tenants: &[Tenant]) {
    if tenants.is_empty() {
        println!("No tenants found.");
        return;
    }

    let today = Utc::now().date_naive();

    println!();
    println!(
        "{:<6}  {:<30}  {:<20}  {:<12}  {:<8}",
        "ID", "NAME", "SCHEMA", "PAID UNTIL", "ACTIVE"
    );
    println!("{}", "-".repeat(84));
    for tenant in tenants {
        println!(
            "{:<6}  {:<30}  {:<20}  {:<12}  {:<8}",
            tenant.id,
            truncate(&tenant.name, 30),
            truncate(&tenant.schema_name, 20),
            or_dash(tenant.paid_until),
            if tenant.is_active(today) { "yes" } else { "no" }
        );
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use taskdesk_shared::models::task::TaskStatus;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a much longer title", 10), "a much ...");
    }

    #[test]
    fn test_update_from_flags() {
        let fields = TaskFields {
            status: Some(TaskStatus::Done),
            ..Default::default()
        };
        let changes = update_from(None, &fields);
        assert!(!changes.is_empty());
        assert_eq!(changes.status, Some(TaskStatus::Done));

        assert!(update_from(None, &TaskFields::default()).is_empty());
    }

    #[test]
    fn test_flag_overrides_api_url() {
        let cli = Cli::try_parse_from([
            "taskdesk",
            "--api-url",
            "https://tasks.example.com",
            "--session-file",
            "/tmp/taskdesk-test-session.json",
            "status",
        ])
        .unwrap();

        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.api.base_url, "https://tasks.example.com");
        assert_eq!(
            config.session.file,
            Some(PathBuf::from("/tmp/taskdesk-test-session.json"))
        );
    }

    #[test]
    fn test_only_admins_and_managers_manage_users() {
        let user = |role: &str| -> User {
            serde_json::from_value(serde_json::json!({
                "id": 3,
                "username": "carol",
                "role": role
            }))
            .unwrap()
        };

        assert!(ensure_can_manage(&user("admin")).is_ok());
        assert!(ensure_can_manage(&user("manager")).is_ok());

        let err = ensure_can_manage(&user("employee")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "carol has role 'user' and cannot create or delete users"
        );
    }

    #[test]
    fn test_password_flag_is_used_verbatim() {
        assert_eq!(password_or_prompt(Some("s3cret")).unwrap(), "s3cret");
    }
}
