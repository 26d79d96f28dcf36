use hearth_core::auth::{OAuthProvider, SessionPersistence};
use hearth_core::ClientConfig;

use crate::auth::{auth_client, SessionStore};
use crate::cli::AuthCommands;
use crate::error::CliError;

pub async fn run_auth(command: AuthCommands, config: &ClientConfig) -> Result<(), CliError> {
    let client = auth_client(config)?;
    match command {
        AuthCommands::Login {
            redirect_url: None,
            redirect_to,
        } => {
            let url = client.authorize_url(OAuthProvider::Google, &redirect_to)?;
            println!("Open this URL in a browser and sign in:");
            println!("{url}");
            println!();
            println!("Then run `hearth auth login --redirect-url '<URL you landed on>'`");
            Ok(())
        }
        AuthCommands::Login {
            redirect_url: Some(redirect_url),
            ..
        } => {
            let session = client.session_from_redirect(&redirect_url).await?;
            let email_label = session.user.email.as_deref().unwrap_or("(no email)");
            println!(
                "Signed in as {} <{email_label}>",
                session.user.display_name
            );
            Ok(())
        }
        AuthCommands::Status => {
            if let Some(session) = client.restore_session().await? {
                let email_label = session.user.email.as_deref().unwrap_or("(no email)");
                println!(
                    "Signed in as {} <{email_label}> (expires_at={})",
                    session.user.display_name, session.expires_at
                );
            } else {
                println!("Not signed in.");
            }
            Ok(())
        }
        AuthCommands::Logout => {
            let store = SessionStore::new(&config.supabase_url);
            if let Some(session) = store.load_session()? {
                client.sign_out(&session.access_token).await?;
            } else {
                store.clear_session()?;
            }
            println!("Signed out");
            Ok(())
        }
    }
}
