use anyhow::{Result, bail};
use chrono::{NaiveDate, Utc};
use clap::{CommandFactory, Parser, Subcommand};
use console::Term;
use dealboard::AppCommand;
use dealboard::core::deal::{DealDraft, DealPatch, Stage};
use dealboard::core::log::init_logging;
use rust_decimal::Decimal;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Create an account
    SignUp {
        #[arg(long)]
        email: String,
        /// Full name shown on the dashboard
        #[arg(long)]
        name: String,
    },
    /// Sign in and remember the session
    SignIn {
        #[arg(long)]
        email: String,
    },
    /// Forget the stored session
    SignOut,
    /// List deals, newest first
    Deals {
        /// Only show deals whose name, company or owner contains this text
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Create a deal
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        company: String,
        #[arg(long)]
        amount: Decimal,
        /// Deal date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Sales rep responsible for the deal
        #[arg(long)]
        owner: String,
        /// negotiation, won or lost
        #[arg(long)]
        stage: Option<Stage>,
    },
    /// Change fields of an existing deal
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        company: Option<String>,
        #[arg(long)]
        amount: Option<Decimal>,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        owner: Option<String>,
        #[arg(long)]
        stage: Option<Stage>,
    },
    /// Delete one or more deals
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Show sales statistics and recent deals
    Dashboard,
}

fn prompt_password(prompt: &str) -> Result<String> {
    let term = Term::stderr();
    term.write_str(prompt)?;
    Ok(term.read_secure_line()?)
}

fn confirm(prompt: &str) -> Result<bool> {
    let term = Term::stderr();
    term.write_str(&format!("{prompt} [y/N] "))?;
    let answer = term.read_line()?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

/// Turns parsed arguments into an app command, prompting where needed.
/// `Ok(None)` means the user backed out.
fn into_app_command(command: Commands) -> Result<Option<AppCommand>> {
    let app_command = match command {
        Commands::Setup => unreachable!("Setup command should be handled separately"),
        Commands::SignUp { email, name } => AppCommand::SignUp {
            email,
            full_name: name,
            password: prompt_password("Password: ")?,
            confirmation: prompt_password("Confirm password: ")?,
        },
        Commands::SignIn { email } => AppCommand::SignIn {
            email,
            password: prompt_password("Password: ")?,
        },
        Commands::SignOut => AppCommand::SignOut,
        Commands::Deals { search } => AppCommand::Deals { search },
        Commands::Add {
            name,
            company,
            amount,
            date,
            owner,
            stage,
        } => AppCommand::Add(DealDraft {
            name,
            company,
            amount,
            deal_date: date.unwrap_or_else(|| Utc::now().date_naive()),
            owner,
            stage,
        }),
        Commands::Edit {
            id,
            name,
            company,
            amount,
            date,
            owner,
            stage,
        } => {
            let patch = DealPatch {
                name,
                company,
                amount,
                deal_date: date,
                owner,
                stage,
            };
            if patch.is_empty() {
                bail!("Nothing to change. Pass at least one field, e.g. --stage won");
            }
            AppCommand::Edit { id, patch }
        }
        Commands::Delete { ids, yes } => {
            let prompt = format!("Delete {} deal(s)? This cannot be undone.", ids.len());
            if !yes && !confirm(&prompt)? {
                return Ok(None);
            }
            AppCommand::Delete { ids }
        }
        Commands::Dashboard => AppCommand::Dashboard,
    };
    Ok(Some(app_command))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => dealboard::cli::setup::setup(),
        Some(cmd) => match into_app_command(cmd) {
            Ok(Some(app_command)) => {
                dealboard::run_command(app_command, cli.config_path.as_deref()).await
            }
            Ok(None) => {
                println!("Cancelled");
                Ok(())
            }
            Err(e) => Err(e),
        },
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
