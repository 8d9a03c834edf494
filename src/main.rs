//! Opportunity Console CLI
//! Mission: Drive the console API from the terminal with a persistent session

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use oppconsole::api::ApiClient;
use oppconsole::models::Config;
use oppconsole::session::{
    decide, nav_visible, Access, CredentialStore, Role, SessionManager, SessionStatus, ViewPolicy,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// The console's views and what each one demands, mirroring the web UI's
/// route table. The admin entry doubles as the role-gated nav affordance.
const VIEWS: &[(&str, ViewPolicy)] = &[
    ("dashboard", ViewPolicy::SignedIn),
    ("submit", ViewPolicy::SignedIn),
    ("reports", ViewPolicy::SignedIn),
    ("partners", ViewPolicy::SignedIn),
    ("admin", ViewPolicy::Role(Role::Admin)),
];

#[derive(Parser)]
#[command(name = "oppconsole", about = "Session-managed client for the opportunity console API")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in and persist the session
    Login {
        username: String,
        #[arg(env = "OPPCONSOLE_PASSWORD")]
        password: String,
    },
    /// Create an account, then sign in with it
    Signup {
        username: String,
        #[arg(env = "OPPCONSOLE_PASSWORD")]
        password: String,
    },
    /// Drop the persisted session
    Logout,
    /// Show the identity behind the stored session, if any
    Whoami,
    /// Show the session state and per-view access decisions
    Status,
    /// Reset a user's password
    ResetPassword {
        username: String,
        new_password: String,
    },
    /// User administration (requires an admin session)
    Admin {
        #[command(subcommand)]
        command: AdminCommand,
    },
}

#[derive(Subcommand)]
enum AdminCommand {
    /// List all users
    Users,
    /// Create a user with an explicit role
    CreateUser {
        username: String,
        password: String,
        #[arg(long, default_value = "user")]
        role: String,
    },
    /// Change one user's role
    SetRole { username: String, role: String },
    /// Delete one user
    DeleteUser { username: String },
    /// Set the same role on several users at once
    BulkRole {
        role: String,
        usernames: Vec<String>,
    },
    /// Delete several users at once
    BulkDelete { usernames: Vec<String> },
}

fn parse_role(s: &str) -> Result<Role> {
    Role::from_str(s).with_context(|| format!("Unknown role '{}', expected user or admin", s))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let client = Arc::new(ApiClient::from_config(&config));
    let store = CredentialStore::new(&config.state_dir);
    let manager = SessionManager::new(client.clone(), store);

    match cli.command {
        Command::Login { username, password } => {
            let identity = manager.login(&username, &password).await?;
            println!("Signed in as {} ({})", identity.username, identity.role.as_str());
        }
        Command::Signup { username, password } => {
            let identity = manager.signup(&username, &password).await?;
            println!("Account created; signed in as {} ({})", identity.username, identity.role.as_str());
        }
        Command::Logout => {
            manager.logout();
            println!("Signed out");
        }
        Command::Whoami => {
            manager.bootstrap().await;
            match manager.session().identity {
                Some(identity) => println!(
                    "{} ({}) [id {}]",
                    identity.username,
                    identity.role.as_str(),
                    identity.id
                ),
                None => println!("Not signed in"),
            }
        }
        Command::Status => {
            manager.bootstrap().await;
            let session = manager.session();
            match (&session.status, &session.identity) {
                (SessionStatus::Authenticated, Some(identity)) => println!(
                    "Session: authenticated as {} ({})",
                    identity.username,
                    identity.role.as_str()
                ),
                _ => println!("Session: anonymous"),
            }
            for (view, policy) in VIEWS {
                let access = match decide(&session, *policy) {
                    Access::Render => "render",
                    Access::Wait => "wait",
                    Access::RedirectToLogin => "redirect to login",
                    Access::Deny => "deny",
                };
                println!("  {:<10} {}", view, access);
            }
            println!(
                "  admin nav  {}",
                if nav_visible(&session, ViewPolicy::Role(Role::Admin)) {
                    "shown"
                } else {
                    "hidden"
                }
            );
        }
        Command::ResetPassword {
            username,
            new_password,
        } => {
            client.reset_password(&username, &new_password).await?;
            println!("Password reset for {}", username);
        }
        Command::Admin { command } => {
            manager.bootstrap().await;
            let session = manager.session();
            // Same gate the UI applies to the admin view and nav entry
            match decide(&session, ViewPolicy::Role(Role::Admin)) {
                Access::Render => {}
                Access::RedirectToLogin => bail!("Not signed in; run `oppconsole login` first"),
                Access::Deny => bail!("Admin access required"),
                Access::Wait => bail!("Session still resolving; try again"),
            }
            let token = session.token.context("Session has no token")?;
            run_admin(&client, &token, command).await?;
        }
    }

    Ok(())
}

async fn run_admin(client: &ApiClient, token: &str, command: AdminCommand) -> Result<()> {
    match command {
        AdminCommand::Users => {
            let users = client.list_users(token).await?;
            for user in users {
                println!(
                    "{:<24} {:<6} created {}  last signin {}",
                    user.username,
                    user.role.as_str(),
                    user.created_at.as_deref().unwrap_or("-"),
                    user.last_signin.as_deref().unwrap_or("-"),
                );
            }
        }
        AdminCommand::CreateUser {
            username,
            password,
            role,
        } => {
            let role = parse_role(&role)?;
            client.create_user(token, &username, &password, role).await?;
            println!("Created {} ({})", username, role.as_str());
        }
        AdminCommand::SetRole { username, role } => {
            let role = parse_role(&role)?;
            client.set_role(token, &username, role).await?;
            println!("Set {} to {}", username, role.as_str());
        }
        AdminCommand::DeleteUser { username } => {
            client.delete_user(token, &username).await?;
            println!("Deleted {}", username);
        }
        AdminCommand::BulkRole { role, usernames } => {
            if usernames.is_empty() {
                bail!("No usernames given");
            }
            let role = parse_role(&role)?;
            client.bulk_set_role(token, &usernames, role).await?;
            println!("Set {} users to {}", usernames.len(), role.as_str());
        }
        AdminCommand::BulkDelete { usernames } => {
            if usernames.is_empty() {
                bail!("No usernames given");
            }
            client.bulk_delete(token, &usernames).await?;
            println!("Deleted {} users", usernames.len());
        }
    }
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "oppconsole=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
