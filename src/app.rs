//! App configuration
//!
//! The host hands the bridge a [`FirestoreConfig`] when it initializes the
//! database. Every field is optional on the wire; the backend decides which
//! ones it needs and fails initialization otherwise.

use serde::{Deserialize, Serialize};
use std::env;

/// Name under which the bridge registers its app with the backend
pub const APP_NAME: &str = "CapacitorFirestore";

/// Environment variable holding the project id
pub const ENV_PROJECT_ID: &str = "FIREBASE_PROJECT_ID";
/// Environment variable holding the application id
pub const ENV_APP_ID: &str = "FIREBASE_APP_ID";
/// Environment variable holding the API key
pub const ENV_API_KEY: &str = "FIREBASE_API_KEY";

/// Firebase project configuration
///
/// # Example
/// ```
/// use firestore_bridge::FirestoreConfig;
///
/// let config: FirestoreConfig = serde_json::from_str(
///     r#"{"projectId": "my-first-project", "apiKey": "XxxxxxxxxxxXXxxxxxxxxx"}"#,
/// ).unwrap();
/// assert_eq!(config.project_id.as_deref(), Some("my-first-project"));
/// assert!(config.application_id.is_none());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirestoreConfig {
    /// GCP/Firebase project id, e.g. `"my-first-project"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    /// Firebase application id, e.g. `"1:00000000000:web:abc00000000000000000"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_id: Option<String>,

    /// Firebase API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl FirestoreConfig {
    /// Create a config with all three values set
    pub fn new(
        project_id: impl Into<String>,
        application_id: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            project_id: Some(project_id.into()),
            application_id: Some(application_id.into()),
            api_key: Some(api_key.into()),
        }
    }

    /// Read the config from `FIREBASE_PROJECT_ID`, `FIREBASE_APP_ID` and
    /// `FIREBASE_API_KEY`
    ///
    /// Unset or empty variables leave the matching field as `None`.
    pub fn from_env() -> Self {
        Self {
            project_id: read_env(ENV_PROJECT_ID),
            application_id: read_env(ENV_APP_ID),
            api_key: read_env(ENV_API_KEY),
        }
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.is_empty())
}
