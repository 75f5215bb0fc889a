use super::ui;
use crate::providers::supabase_auth::{SignUpOutcome, SupabaseAuth};
use crate::store::SessionFile;
use anyhow::Result;
use tracing::warn;

pub async fn sign_in(
    auth: &SupabaseAuth,
    sessions: &SessionFile,
    email: &str,
    password: &str,
) -> Result<()> {
    let pb = ui::new_spinner("Signing in...");
    let result = auth.sign_in_with_password(email, password).await;
    pb.finish_and_clear();

    let session = result?;
    sessions.save(&session)?;
    println!(
        "Signed in as {}",
        ui::style_text(session.user.display_name(), ui::StyleType::TotalLabel)
    );
    Ok(())
}

pub async fn sign_up(
    auth: &SupabaseAuth,
    sessions: &SessionFile,
    email: &str,
    password: &str,
    confirmation: &str,
    full_name: &str,
) -> Result<()> {
    let pb = ui::new_spinner("Creating account...");
    let result = auth.sign_up(email, password, confirmation, full_name).await;
    pb.finish_and_clear();

    match result? {
        SignUpOutcome::SignedIn(session) => {
            sessions.save(&session)?;
            println!(
                "Account created. Signed in as {}",
                ui::style_text(session.user.display_name(), ui::StyleType::TotalLabel)
            );
        }
        SignUpOutcome::ConfirmationRequired(user) => {
            println!(
                "Account created for {}. Confirm your email, then run `dealboard sign-in`.",
                user.email.as_deref().unwrap_or(email)
            );
        }
    }
    Ok(())
}

pub async fn sign_out(auth: &SupabaseAuth, sessions: &SessionFile) -> Result<()> {
    if let Err(e) = auth.sign_out().await {
        warn!(error = %e, "Sign-out request failed, removing local session anyway");
    }
    if sessions.clear()? {
        println!("Signed out");
    } else {
        println!("{}", ui::style_text("Not signed in", ui::StyleType::Subtle));
    }
    Ok(())
}
