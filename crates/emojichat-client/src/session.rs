//! The session context built once at startup and handed to every component
//! that needs the caller's identity or the store.

use tracing::info;

use emojichat_shared::UserId;
use emojichat_store::RealtimeStore;

use crate::identity::{IdentityError, IdentityProvider};

/// Who this client is and which store it talks to.
#[derive(Debug, Clone)]
pub struct SessionContext<S> {
    user_id: UserId,
    store: S,
}

impl<S: RealtimeStore> SessionContext<S> {
    /// Run the identity handshake and bind the result to `store`.
    pub async fn establish<P: IdentityProvider>(
        provider: &P,
        store: S,
    ) -> Result<Self, IdentityError> {
        let user_id = provider.authenticate().await?;
        info!(user = %user_id.short(), "session established");
        Ok(Self { user_id, store })
    }

    pub fn new(user_id: UserId, store: S) -> Self {
        Self { user_id, store }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}
