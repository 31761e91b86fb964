//! Login and registration flow.
//!
//! Decides where a freshly connected account lands: the owner and admins
//! get the admin view, registered users the reporting view.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::client::ReportClient;
use crate::error::{ClientError, InitError};
use crate::types::Address;

/// What the user asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthIntent {
    Login,
    Register,
}

/// Role the account was admitted with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthOutcome {
    Owner(Address),
    Admin(Address),
    User(Address),
}

impl AuthOutcome {
    pub fn account(&self) -> Address {
        match self {
            AuthOutcome::Owner(a) | AuthOutcome::Admin(a) | AuthOutcome::User(a) => *a,
        }
    }

    /// Owner and admins see the admin dashboard.
    pub fn is_admin(&self) -> bool {
        !matches!(self, AuthOutcome::User(_))
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Failed to connect wallet: {0}")]
    Init(#[from] InitError),

    #[error("User not registered. Please register first.")]
    NotRegistered,

    #[error("User already registered. Please login instead.")]
    AlreadyRegistered,

    #[error(transparent)]
    Registration(ClientError),
}

/// Connect, then admit the selected account according to `intent`.
pub async fn authenticate(
    client: &ReportClient,
    intent: AuthIntent,
) -> Result<AuthOutcome, AuthError> {
    let account = client.initialize().await?;

    match client.get_owner().await {
        Ok(owner) if owner == account => {
            info!(%account, "Owner logged in");
            return Ok(AuthOutcome::Owner(account));
        }
        Ok(_) => {}
        Err(e) => warn!(%account, error = %e, "Owner lookup failed, continuing as non-owner"),
    }

    let registered = client.is_registered(account).await;
    match (intent, registered) {
        (AuthIntent::Login, false) => return Err(AuthError::NotRegistered),
        (AuthIntent::Register, true) => return Err(AuthError::AlreadyRegistered),
        (AuthIntent::Register, false) => {
            client
                .register_user()
                .await
                .map_err(AuthError::Registration)?;
        }
        (AuthIntent::Login, true) => {}
    }

    if client.is_admin(account).await {
        info!(%account, "Admin logged in");
        Ok(AuthOutcome::Admin(account))
    } else {
        info!(%account, "User logged in");
        Ok(AuthOutcome::User(account))
    }
}
