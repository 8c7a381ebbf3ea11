//! Tableside CLI - drive the food-ordering client from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Check the order server is up
//! tableside ping
//!
//! # Sign in and browse the menu
//! tableside account login -e diner@example.com -p 's3curepass'
//! tableside menu
//!
//! # Build an order
//! tableside cart add "Pad Thai" --kind entree --price 12.50 --quantity 2
//! tableside cart set "Pad Thai" 3
//! tableside cart show
//!
//! # Fetch the server-confirmed checkout total
//! tableside checkout
//! ```
//!
//! # Commands
//!
//! - `ping` - Order server liveness check
//! - `menu` - Fetch the menu (requires sign-in)
//! - `cart` - Add, edit, list, and clear cart items
//! - `account` - Login, signup, logout, whoami, delete
//! - `checkout` - Fetch a payment intent and display the server total

#![cfg_attr(not(test), forbid(unsafe_code))]
// Terminal output is this binary's job
#![allow(clippy::print_stdout, clippy::print_stderr)]

use clap::{Parser, Subcommand};
use secrecy::SecretString;

use tableside_client::config::ClientConfig;
use tableside_client::error::ClientError;
use tableside_client::state::AppState;

mod commands;

#[derive(Parser)]
#[command(name = "tableside")]
#[command(author, version, about = "Tableside food-ordering CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the order server is reachable
    Ping,
    /// Fetch and print the menu
    Menu,
    /// Cart operations
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Account and session operations
    Account {
        #[command(subcommand)]
        action: AccountAction,
    },
    /// Fetch a payment intent and display the server-confirmed total
    Checkout,
}

#[derive(Subcommand)]
enum CartAction {
    /// Add an item to the cart
    Add {
        /// Item display name
        name: String,

        /// Item kind (`appetizer`, `entree`, `side`, `drink`, `dessert`)
        #[arg(short, long, default_value = "entree")]
        kind: String,

        /// Price per item, in dollars
        #[arg(short, long)]
        price: rust_decimal::Decimal,

        /// How many to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set an item's quantity (0 removes it)
    Set {
        /// Item display name
        name: String,
        /// New quantity
        quantity: u32,
    },
    /// Remove an item
    Remove {
        /// Item display name
        name: String,
    },
    /// Print the cart with totals
    Show,
    /// Empty the cart
    Clear,
}

#[derive(Subcommand)]
enum AccountAction {
    /// Log in with email and password
    Login {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long)]
        password: String,
    },
    /// Create an account
    Signup {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Account password (needs a letter and a digit, 8+ characters)
        #[arg(short, long)]
        password: String,
    },
    /// Sign out and invalidate the token
    Logout,
    /// Print the restored session, if any
    Whoami,
    /// Delete the account and wipe local state
    Delete,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    // Error tracking, kept alive for the duration of the process
    let _sentry_guard = config.sentry_dsn.as_ref().map(|dsn| {
        sentry::init((
            dsn.as_str(),
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    let state = AppState::new(config);

    if let Err(e) = run(cli, &state).await {
        let e = e.report();
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, state: &AppState) -> Result<(), ClientError> {
    match cli.command {
        Commands::Ping => commands::order::ping(state).await?,
        Commands::Menu => commands::order::menu(state).await?,
        Commands::Cart { action } => match action {
            CartAction::Add {
                name,
                kind,
                price,
                quantity,
            } => {
                let kind = kind.parse().map_err(ClientError::Internal)?;
                commands::cart::add(state, &name, kind, price, quantity).await?;
            }
            CartAction::Set { name, quantity } => {
                commands::cart::set(state, &name, quantity).await?;
            }
            CartAction::Remove { name } => commands::cart::remove(state, &name).await?,
            CartAction::Show => commands::cart::show(state)?,
            CartAction::Clear => commands::cart::clear(state).await?,
        },
        Commands::Account { action } => match action {
            AccountAction::Login { email, password } => {
                commands::account::login(state, &email, SecretString::from(password)).await?;
            }
            AccountAction::Signup {
                email,
                name,
                password,
            } => {
                commands::account::signup(state, &email, &name, SecretString::from(password))
                    .await?;
            }
            AccountAction::Logout => commands::account::logout(state).await?,
            AccountAction::Whoami => commands::account::whoami(state).await?,
            AccountAction::Delete => commands::account::delete(state).await?,
        },
        Commands::Checkout => commands::order::checkout(state).await?,
    }
    Ok(())
}
