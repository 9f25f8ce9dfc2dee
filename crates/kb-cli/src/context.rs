//! Connection settings shared by the commands that talk to the API

use std::sync::Arc;

use kb_remote::{ClientOptions, KnowledgeClient, KnowledgeStore};

use crate::error::{CliError, Result};

/// API endpoint and credential gathered from flags or the environment.
#[derive(Debug, Clone)]
pub struct Connection {
    api_url: Option<String>,
    api_key: Option<String>,
}

impl Connection {
    pub fn new(api_url: Option<String>, api_key: Option<String>) -> Self {
        Self { api_url, api_key }
    }

    /// Build the HTTP store, failing with a hint when a setting is missing.
    pub fn store(&self) -> Result<Arc<dyn KnowledgeStore>> {
        let api_url = non_empty(self.api_url.as_deref())
            .ok_or_else(|| CliError::user("Missing API URL: pass --api-url or set KB_API_URL"))?;
        let api_key = non_empty(self.api_key.as_deref())
            .ok_or_else(|| CliError::user("Missing API key: pass --api-key or set KB_API_KEY"))?;

        let client = KnowledgeClient::new(ClientOptions::new(api_url, api_key))?;
        tracing::debug!(base_url = %client.base_url(), "Using knowledge API");
        Ok(Arc::new(client))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_error(connection: Connection) -> CliError {
        let Err(err) = connection.store() else {
            panic!("expected the store to be rejected");
        };
        err
    }

    #[test]
    fn missing_url_is_a_user_error() {
        let err = store_error(Connection::new(None, Some("key".into())));
        assert!(matches!(err, CliError::User { .. }));
        assert!(err.to_string().contains("KB_API_URL"));
    }

    #[test]
    fn blank_key_is_a_user_error() {
        let err = store_error(Connection::new(
            Some("http://localhost".into()),
            Some("  ".into()),
        ));
        assert!(err.to_string().contains("KB_API_KEY"));
    }

    #[test]
    fn builds_store_when_configured() {
        let connection = Connection::new(Some("http://localhost/v1/".into()), Some("key".into()));
        assert!(connection.store().is_ok());
    }
}
