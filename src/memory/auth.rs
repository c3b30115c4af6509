//! In-memory authentication

use crate::error::AuthError;
use crate::firestore::client::AuthClient;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use tracing::debug;

/// Signed-in user as seen by a [`MemoryAuth`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryUser {
    /// User id; the token's text
    pub uid: String,
}

pub(crate) type CurrentUser = Arc<StdMutex<Option<MemoryUser>>>;

/// Identity toolkit error codes queued for upcoming sign-ins
pub(crate) type SignInFailures = Arc<StdMutex<VecDeque<String>>>;

/// [`AuthClient`] that accepts any non-empty custom token
///
/// The token itself becomes the user's uid. Rejections are reported as
/// identity toolkit error codes and mapped with [`AuthError::from_error_code`].
#[derive(Debug, Clone, Default)]
pub struct MemoryAuth {
    current_user: CurrentUser,
    failures: SignInFailures,
}

impl MemoryAuth {
    pub(crate) fn new(current_user: CurrentUser, failures: SignInFailures) -> Self {
        Self {
            current_user,
            failures,
        }
    }

    /// The signed-in user, if any
    pub fn current_user(&self) -> Option<MemoryUser> {
        self.current_user
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Error code the identity toolkit would answer `token` with
    fn rejection(&self, token: &str) -> Option<String> {
        let queued = self
            .failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        queued.or_else(|| token.trim().is_empty().then(|| "INVALID_CUSTOM_TOKEN".to_string()))
    }

    fn set_current_user(&self, user: Option<MemoryUser>) {
        *self
            .current_user
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = user;
    }
}

#[async_trait]
impl AuthClient for MemoryAuth {
    async fn sign_in_with_custom_token(&self, token: &str) -> Result<(), AuthError> {
        if let Some(code) = self.rejection(token) {
            debug!(code = %code, "custom token sign-in rejected");
            return Err(AuthError::from_error_code(&code));
        }

        self.set_current_user(Some(MemoryUser {
            uid: token.to_string(),
        }));
        debug!("signed in with custom token");
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.set_current_user(None);
        Ok(())
    }
}
