//! Deskbridge CLI - Command line access to a helpdesk instance.
//!
//! Connection settings come from a JSON config file or the
//! `DESKBRIDGE_*` environment variables.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::{Map, Value};
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use deskbridge_resources::{Helpdesk, NewAsset, NewTicket, NewUser};
use deskbridge_transport::ApiConfig;

#[derive(Parser)]
#[command(name = "deskbridge")]
#[command(about = "Deskbridge - Helpdesk tickets, users and assets")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON config file (default: DESKBRIDGE_* environment variables).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Retry rate-limited requests this many times.
    #[arg(long, global = true)]
    retries: Option<u32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Work with tickets.
    #[command(subcommand)]
    Ticket(TicketCommand),

    /// Work with users.
    #[command(subcommand)]
    User(UserCommand),

    /// Work with assets.
    #[command(subcommand)]
    Asset(AssetCommand),

    /// Look up categories.
    #[command(subcommand)]
    Category(CategoryCommand),
}

#[derive(Subcommand)]
enum TicketCommand {
    /// Show a ticket.
    Show { id: u64 },

    /// Create a ticket.
    Create {
        #[arg(short, long)]
        subject: String,

        #[arg(short, long)]
        body: String,

        /// Category ID, or a "Section \ Name" to look up.
        #[arg(short, long)]
        category: String,

        /// Priority from -1 (low) to 2 (critical).
        #[arg(short, long, allow_negative_numbers = true)]
        priority: Option<i64>,

        /// Submit on behalf of this user ID.
        #[arg(short, long)]
        user: Option<u64>,

        #[arg(short, long)]
        tags: Option<String>,
    },

    /// Add a comment to a ticket.
    Comment {
        id: u64,

        body: String,

        /// Hide the comment from the submitter.
        #[arg(long)]
        techs_only: bool,
    },

    /// List a ticket's comments.
    Comments { id: u64 },

    /// Change ticket fields.
    Set(SetById),
}

#[derive(Subcommand)]
enum UserCommand {
    /// Show a user.
    Show { username: String },

    /// Create a user. Prompts for the password when not given.
    Create {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        email: String,

        #[arg(long)]
        password: Option<String>,

        #[arg(long)]
        first_name: Option<String>,

        #[arg(long)]
        last_name: Option<String>,
    },

    /// Disable a user account.
    Disable { username: String },

    /// Re-enable a user account.
    Enable { username: String },

    /// Change user fields.
    Set(SetByUsername),
}

#[derive(Subcommand)]
enum AssetCommand {
    /// Show an asset.
    Show { id: u64 },

    /// Create an asset.
    Create {
        #[arg(short, long)]
        model: String,

        #[arg(long)]
        manufacturer: String,

        #[arg(short = 't', long = "type")]
        asset_type: String,

        #[arg(long)]
        supplier: String,

        #[arg(long)]
        serial: Option<String>,

        #[arg(short, long)]
        location: Option<String>,

        #[arg(long)]
        comments: Option<String>,

        #[arg(short, long)]
        quantity: Option<u32>,
    },

    /// Append a line to the asset's Additional log.
    Note {
        id: u64,

        text: String,

        /// Overwrite the log instead of appending.
        #[arg(long)]
        replace: bool,
    },

    /// Change asset fields.
    Set(SetById),
}

#[derive(Subcommand)]
enum CategoryCommand {
    /// Show one category by "Section \ Name".
    Show { name: String },

    /// List all categories.
    List,
}

/// Numeric target plus `Field=Value` assignments.
#[derive(Args)]
struct SetById {
    id: u64,

    /// Assignments such as `StatusID=3`; values are parsed as JSON when possible.
    #[arg(required = true, value_parser = parse_assignment)]
    assignments: Vec<(String, Value)>,
}

/// Username plus `Field=Value` assignments.
#[derive(Args)]
struct SetByUsername {
    username: String,

    #[arg(required = true, value_parser = parse_assignment)]
    assignments: Vec<(String, Value)>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging; stdout carries the JSON output
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config(cli.config.as_ref(), cli.retries)?;
    let helpdesk = Helpdesk::connect(&config).context("Failed to set up API client")?;

    match cli.command {
        Commands::Ticket(command) => cmd_ticket(&helpdesk, command).await,
        Commands::User(command) => cmd_user(&helpdesk, command).await,
        Commands::Asset(command) => cmd_asset(&helpdesk, command).await,
        Commands::Category(command) => cmd_category(&helpdesk, command).await,
    }
}

/// Read connection settings from a file, or the environment.
fn load_config(path: Option<&PathBuf>, retries: Option<u32>) -> Result<ApiConfig> {
    let mut config = match path {
        Some(path) => ApiConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ApiConfig::from_env().context("Failed to read config from environment")?,
    };
    if let Some(retries) = retries {
        config.retry.max_retries = retries;
    }
    debug!("Using API at {}", config.base_url);
    Ok(config)
}

/// Parse `Field=Value`, reading the value as JSON and falling back to a string.
fn parse_assignment(input: &str) -> std::result::Result<(String, Value), String> {
    let (field, value) = input
        .split_once('=')
        .ok_or_else(|| format!("expected 'Field=Value', got '{input}'"))?;

    let field = field.trim();
    if field.is_empty() {
        return Err(format!("missing field name in '{input}'"));
    }
    let value = value.trim();
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((field.to_string(), value))
}

/// Method name for the generic `updateFoo` staging call.
fn update_method(field: &str) -> String {
    format!("update{field}")
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_details(details: &Map<String, Value>) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(details)?);
    Ok(())
}

async fn cmd_ticket(helpdesk: &Helpdesk, command: TicketCommand) -> Result<()> {
    match command {
        TicketCommand::Show { id } => {
            let ticket = helpdesk.ticket(id).await?;
            print_details(ticket.entity().details())
        }

        TicketCommand::Create {
            subject,
            body,
            category,
            priority,
            user,
            tags,
        } => {
            let category_id = match category.parse::<u64>() {
                Ok(id) => id,
                Err(_) => helpdesk
                    .category(&category)
                    .await
                    .with_context(|| format!("Failed to resolve category '{category}'"))?
                    .category_id(),
            };

            let mut ticket = NewTicket::new(subject, body, category_id);
            if let Some(priority) = priority {
                ticket = ticket.with_priority(priority);
            }
            if let Some(user) = user {
                ticket = ticket.with_user(user);
            }
            if let Some(tags) = tags {
                ticket = ticket.with_tags(tags);
            }

            let id = helpdesk
                .create_ticket(&ticket)
                .await
                .context("Failed to create ticket")?;
            println!("{id}");
            Ok(())
        }

        TicketCommand::Comment {
            id,
            body,
            techs_only,
        } => {
            let ticket = helpdesk.ticket(id).await?;
            let comment_id = ticket
                .add_comment(&body, techs_only)
                .await
                .context("Failed to add comment")?;
            info!("Added comment {} to ticket {}", comment_id, id);
            println!("{comment_id}");
            Ok(())
        }

        TicketCommand::Comments { id } => {
            let ticket = helpdesk.ticket(id).await?;
            print_json(&ticket.get_comments().await?)
        }

        TicketCommand::Set(args) => {
            let mut ticket = helpdesk.ticket(args.id).await?;
            for (field, value) in &args.assignments {
                ticket
                    .apply_update_call(&update_method(field), std::slice::from_ref(value))
                    .with_context(|| format!("Cannot set {field}"))?;
            }
            ticket.save().await.context("Failed to save ticket")?;
            print_details(ticket.entity().details())
        }
    }
}

async fn cmd_user(helpdesk: &Helpdesk, command: UserCommand) -> Result<()> {
    match command {
        UserCommand::Show { username } => {
            let user = helpdesk.user(&username).await?;
            print_details(user.entity().details())
        }

        UserCommand::Create {
            username,
            email,
            password,
            first_name,
            last_name,
        } => {
            let password = match password {
                Some(password) => password,
                None => rpassword::prompt_password("Password for new user: ")
                    .context("Failed to read password")?,
            };
            if password.is_empty() {
                anyhow::bail!("Password cannot be empty");
            }

            let new = NewUser::new(username, password, email).with_name(
                first_name.unwrap_or_default(),
                last_name.unwrap_or_default(),
            );
            let id = helpdesk
                .create_user(&new)
                .await
                .context("Failed to create user")?;
            println!("{id}");
            Ok(())
        }

        UserCommand::Disable { username } => set_disabled(helpdesk, &username, true).await,

        UserCommand::Enable { username } => set_disabled(helpdesk, &username, false).await,

        UserCommand::Set(args) => {
            let mut user = helpdesk.user(&args.username).await?;
            for (field, value) in &args.assignments {
                user.apply_update_call(&update_method(field), std::slice::from_ref(value))
                    .with_context(|| format!("Cannot set {field}"))?;
            }
            user.save().await.context("Failed to save user")?;
            print_details(user.entity().details())
        }
    }
}

async fn set_disabled(helpdesk: &Helpdesk, username: &str, disabled: bool) -> Result<()> {
    let mut user = helpdesk.user(username).await?;
    user.update_disabled(disabled)?;
    user.save().await.context("Failed to save user")?;
    info!(
        "User {} is now {}",
        username,
        if disabled { "disabled" } else { "enabled" }
    );
    Ok(())
}

async fn cmd_asset(helpdesk: &Helpdesk, command: AssetCommand) -> Result<()> {
    match command {
        AssetCommand::Show { id } => {
            let asset = helpdesk.asset(id).await?;
            print_details(asset.entity().details())
        }

        AssetCommand::Create {
            model,
            manufacturer,
            asset_type,
            supplier,
            serial,
            location,
            comments,
            quantity,
        } => {
            let mut asset = NewAsset::new(model, manufacturer, asset_type, supplier)
                .with_serial_number(serial.unwrap_or_default())
                .with_location(location.unwrap_or_default())
                .with_comments(comments.unwrap_or_default());
            if let Some(quantity) = quantity {
                asset = asset.with_quantity(quantity);
            }

            let id = helpdesk
                .create_asset(&asset)
                .await
                .context("Failed to create asset")?;
            println!("{id}");
            Ok(())
        }

        AssetCommand::Note { id, text, replace } => {
            let mut asset = helpdesk.asset(id).await?;
            asset.update_additional(&text, replace)?;
            asset.save().await.context("Failed to save asset")?;
            println!("{}", asset.additional().unwrap_or_default());
            Ok(())
        }

        AssetCommand::Set(args) => {
            let mut asset = helpdesk.asset(args.id).await?;
            for (field, value) in &args.assignments {
                asset
                    .apply_update_call(&update_method(field), std::slice::from_ref(value))
                    .with_context(|| format!("Cannot set {field}"))?;
            }
            asset.save().await.context("Failed to save asset")?;
            print_details(asset.entity().details())
        }
    }
}

async fn cmd_category(helpdesk: &Helpdesk, command: CategoryCommand) -> Result<()> {
    match command {
        CategoryCommand::Show { name } => {
            let category = helpdesk.category(&name).await?;
            print_details(category.details())
        }

        CategoryCommand::List => print_json(&Value::Array(helpdesk.categories().await?)),
    }
}
