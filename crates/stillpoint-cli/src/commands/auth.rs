use clap::Subcommand;
use stillpoint_core::integrations::credentials;
use stillpoint_core::{AuthGate, TokenGate};

#[derive(Subcommand)]
pub enum AuthAction {
    /// Store the API token used for check-in submission
    Login {
        /// API token issued by the wellness backend
        #[arg(long)]
        token: String,
    },
    /// Remove the stored token
    Logout,
    /// Check authentication status
    Status,
}

pub fn run(action: AuthAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        AuthAction::Login { token } => {
            if token.trim().is_empty() {
                return Err("token must not be empty".into());
            }
            credentials::store_token(&token)?;
            println!("logged in");
        }
        AuthAction::Logout => {
            credentials::clear_token()?;
            println!("logged out");
        }
        AuthAction::Status => {
            if TokenGate.is_authenticated() {
                println!("authenticated");
            } else {
                println!("not authenticated (run `stillpoint auth login --token <TOKEN>`)");
            }
        }
    }
    Ok(())
}
