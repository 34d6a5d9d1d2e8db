//! PyCon Togo CLI - Database migrations, staff accounts and tickets.
//!
//! # Usage
//!
//! ```bash
//! # Run back office database migrations
//! pycontg migrate
//!
//! # Create a staff account
//! pycontg staff create -e admin@pytogo.org -n "Admin Name" -r admin --password '...'
//!
//! # Print, render or re-issue a ticket
//! pycontg ticket reference 5c663cb9-5b6c-4ff6-a2cf-0c87f2f5127c
//! pycontg ticket render --id 5c663cb9-5b6c-4ff6-a2cf-0c87f2f5127c --name "tester 1" -o ticket.png
//! pycontg ticket issue 5c663cb9-5b6c-4ff6-a2cf-0c87f2f5127c
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `staff create` - Create staff accounts
//! - `ticket` - Ticket references, local rendering and re-issuing

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use pycontg_backoffice::config::TicketConfig;
use pycontg_core::RegistrationId;

mod commands;

#[derive(Parser)]
#[command(name = "pycontg")]
#[command(author, version, about = "PyCon Togo back office CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage staff accounts
    Staff {
        #[command(subcommand)]
        action: StaffAction,
    },
    /// Ticket tools
    Ticket {
        #[command(subcommand)]
        action: TicketAction,
    },
}

#[derive(Subcommand)]
enum StaffAction {
    /// Create a new staff account
    Create {
        /// Staff email address
        #[arg(short, long)]
        email: String,

        /// Staff display name
        #[arg(short, long)]
        name: String,

        /// Staff role (`admin`, `staff`, `reviewer`)
        #[arg(short, long, default_value = "staff")]
        role: String,

        /// Initial password (at least 8 characters)
        #[arg(long, env = "STAFF_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

#[derive(Subcommand)]
enum TicketAction {
    /// Print the ticket reference of a registration id
    Reference {
        /// Registration id
        id: String,

        /// Edition year (defaults to the current edition)
        #[arg(short, long)]
        year: Option<u16>,
    },
    /// Render a ticket to a PNG file without uploading or mailing it
    Render {
        /// Registration id, encoded in the QR code
        #[arg(long)]
        id: String,

        /// Participant name
        #[arg(long)]
        name: String,

        /// Organization (omitted from the ticket when empty)
        #[arg(long, default_value = "")]
        organization: String,

        /// Country/city line (defaults to `DEFAULT_COUNTRY_CITY`)
        #[arg(long)]
        country_city: Option<String>,

        /// Output PNG path
        #[arg(short, long, default_value = "ticket.png")]
        output: PathBuf,
    },
    /// Issue the ticket of a stored registration again (upload + email)
    Issue {
        /// Registration id
        id: RegistrationId,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

#[allow(clippy::print_stdout)]
async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Staff { action } => match action {
            StaffAction::Create {
                email,
                name,
                role,
                password,
            } => {
                let id = commands::staff::create(&email, &name, &role, password).await?;
                println!("{id}");
            }
        },
        Commands::Ticket { action } => match action {
            TicketAction::Reference { id, year } => {
                println!("{}", commands::ticket::reference(&id, year)?);
            }
            TicketAction::Render {
                id,
                name,
                organization,
                country_city,
                output,
            } => {
                let config = TicketConfig::from_env()?;
                let request = commands::ticket::RenderRequest {
                    participant_id: id,
                    name,
                    organization,
                    country_city,
                };
                let reference = commands::ticket::render(&config, &request, &output)?;
                println!("{reference} -> {}", output.display());
            }
            TicketAction::Issue { id } => {
                let ticket = commands::ticket::issue(id).await?;
                println!("{} {}", ticket.reference, ticket.url);
            }
        },
    }
    Ok(())
}
