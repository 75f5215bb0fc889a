pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::core::config::AppConfig;
use crate::core::deal::{DealDraft, DealPatch};
use crate::core::repository::DealRepository;
use crate::providers::{SupabaseAuth, SupabaseClient, SupabaseDealStore};
use crate::store::SessionFile;
use anyhow::{Context, Result, bail};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

/// Commands that talk to the backend. Interactive input (passwords,
/// confirmations) is collected by the caller beforehand.
pub enum AppCommand {
    SignUp {
        email: String,
        full_name: String,
        password: String,
        confirmation: String,
    },
    SignIn {
        email: String,
        password: String,
    },
    SignOut,
    Deals {
        search: Option<String>,
    },
    Add(DealDraft),
    Edit {
        id: String,
        patch: DealPatch,
    },
    Delete {
        ids: Vec<String>,
    },
    Dashboard,
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("Dealboard starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    run_with_config(command, config).await
}

/// Runs `command` against an already loaded configuration.
pub async fn run_with_config(command: AppCommand, config: AppConfig) -> Result<()> {
    debug!("Loaded config: {config:#?}");

    let sessions = SessionFile::in_dir(&config.data_dir()?);
    let client = Arc::new(
        SupabaseClient::new(&config.supabase.url, &config.supabase.anon_key)?
            .with_session(sessions.load()?),
    );
    let auth = Arc::new(SupabaseAuth::new(Arc::clone(&client)));
    let currency = config.currency.as_str();

    match command {
        AppCommand::SignUp {
            email,
            full_name,
            password,
            confirmation,
        } => {
            cli::auth::sign_up(&auth, &sessions, &email, &password, &confirmation, &full_name)
                .await
        }
        AppCommand::SignIn { email, password } => {
            cli::auth::sign_in(&auth, &sessions, &email, &password).await
        }
        AppCommand::SignOut => cli::auth::sign_out(&auth, &sessions).await,
        command => {
            let Some(mut session) = client.session() else {
                bail!("Not signed in. Run `dealboard sign-in` first.");
            };
            if session.is_expired(Utc::now()) {
                debug!("Session expired, refreshing");
                session = auth
                    .refresh_session()
                    .await
                    .context("Session expired. Run `dealboard sign-in` again.")?;
                sessions.save(&session)?;
            }

            let store = Arc::new(SupabaseDealStore::new(Arc::clone(&client)));
            match command {
                AppCommand::Deals { search } => {
                    let repo = DealRepository::activate(store, auth);
                    cli::deals::list(&repo, search.as_deref(), currency).await
                }
                AppCommand::Dashboard => {
                    let repo = DealRepository::activate(store, auth);
                    cli::dashboard::run(&repo, Some(&session.user), currency).await
                }
                AppCommand::Add(draft) => {
                    let repo = DealRepository::new(store, auth);
                    cli::deals::add(&repo, draft, currency).await
                }
                AppCommand::Edit { id, patch } => {
                    let repo = DealRepository::new(store, auth);
                    cli::deals::edit(&repo, &id, patch, currency).await
                }
                AppCommand::Delete { ids } => {
                    let repo = DealRepository::new(store, auth);
                    cli::deals::delete(&repo, &ids).await
                }
                AppCommand::SignUp { .. } | AppCommand::SignIn { .. } | AppCommand::SignOut => {
                    unreachable!("auth commands are handled above")
                }
            }
        }
    }
}
