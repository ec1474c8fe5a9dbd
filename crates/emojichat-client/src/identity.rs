//! Anonymous identity provider.
//!
//! The session asks the provider for an opaque [`UserId`] exactly once at
//! startup. Nothing else about the identity is known or stored.

use thiserror::Error;
use tracing::info;

use emojichat_shared::UserId;

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("Authentication failed: {0}")]
    Failed(String),
}

#[allow(async_fn_in_trait)]
pub trait IdentityProvider {
    async fn authenticate(&self) -> Result<UserId, IdentityError>;
}

/// Mints a fresh anonymous id, or hands back a fixed one when the client was
/// configured to reuse an earlier identity.
#[derive(Debug, Clone, Default)]
pub struct AnonymousAuth {
    fixed: Option<UserId>,
}

impl AnonymousAuth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user_id(user_id: UserId) -> Self {
        Self {
            fixed: Some(user_id),
        }
    }
}

impl IdentityProvider for AnonymousAuth {
    async fn authenticate(&self) -> Result<UserId, IdentityError> {
        let user_id = match &self.fixed {
            Some(id) if id.as_str().trim().is_empty() => {
                return Err(IdentityError::Failed("configured user id is blank".into()));
            }
            Some(id) => id.clone(),
            None => UserId::anonymous(),
        };
        info!(user = %user_id.short(), "signed in anonymously");
        Ok(user_id)
    }
}
