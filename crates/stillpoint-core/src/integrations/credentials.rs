//! API token storage and the keyring-backed authentication gate.

use super::traits::AuthGate;
use crate::error::Result;

const API_TOKEN_KEY: &str = "api_token";

/// Thin wrapper around the OS keyring for credential storage.
pub mod keyring_store {
    const SERVICE: &str = "stillpoint";

    pub fn get(key: &str) -> Result<Option<String>, keyring::Error> {
        let entry = keyring::Entry::new(SERVICE, key)?;
        match entry.get_password() {
            Ok(pw) => Ok(Some(pw)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn set(key: &str, value: &str) -> Result<(), keyring::Error> {
        let entry = keyring::Entry::new(SERVICE, key)?;
        entry.set_password(value)
    }

    pub fn delete(key: &str) -> Result<(), keyring::Error> {
        let entry = keyring::Entry::new(SERVICE, key)?;
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// Load the stored API token, if any.
pub fn load_token() -> Result<Option<String>> {
    Ok(keyring_store::get(API_TOKEN_KEY)?.filter(|t| !t.trim().is_empty()))
}

pub fn store_token(token: &str) -> Result<()> {
    keyring_store::set(API_TOKEN_KEY, token.trim())?;
    Ok(())
}

pub fn clear_token() -> Result<()> {
    keyring_store::delete(API_TOKEN_KEY)?;
    Ok(())
}

/// Authenticated when an API token is present in the OS keyring.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokenGate;

impl AuthGate for TokenGate {
    fn is_authenticated(&self) -> bool {
        match load_token() {
            Ok(token) => token.is_some(),
            Err(e) => {
                tracing::warn!(error = %e, "could not read API token from keyring");
                false
            }
        }
    }
}
