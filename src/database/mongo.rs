//! MongoDB-backed document store.

use async_trait::async_trait;
use mongodb::bson::doc;
use mongodb::options::ClientOptions;
use mongodb::{Client, Database};

use crate::config::DatabaseConfig;
use crate::database::{redact_uri, DatabaseError, DocumentStore};

/// Database used when the URI names none.
const FALLBACK_DATABASE: &str = "conduit";

/// Shared MongoDB client.
#[derive(Clone, Debug)]
pub struct MongoStore {
    client: Client,
    database: String,
    target: String,
}

impl MongoStore {
    /// Create the client for the configured URI.
    ///
    /// The driver connects lazily in the background, so an unreachable server
    /// does not fail here; only a malformed URI does.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let target = redact_uri(&config.uri);

        let options = ClientOptions::parse(&config.uri)
            .await
            .map_err(|source| DatabaseError::InvalidUri {
                uri: target.clone(),
                source,
            })?;

        let database = options
            .default_database
            .clone()
            .unwrap_or_else(|| FALLBACK_DATABASE.to_string());

        let client = Client::with_options(options).map_err(|source| DatabaseError::InvalidUri {
            uri: target.clone(),
            source,
        })?;

        tracing::info!(
            target_uri = %target,
            database = %database,
            debug = config.debug,
            "Database client created"
        );
        if config.debug {
            tracing::info!("Database command logging enabled");
        }

        Ok(Self {
            client,
            database,
            target,
        })
    }

    pub fn database_name(&self) -> &str {
        &self.database
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    fn target(&self) -> &str {
        &self.target
    }

    fn database(&self) -> Option<Database> {
        Some(self.client.database(&self.database))
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        self.client
            .database(&self.database)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(DatabaseError::Command)?;
        Ok(())
    }

    async fn close(&self) {
        self.client.clone().shutdown().await;
        tracing::info!(target_uri = %self.target, "Database connection closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_is_lazy() {
        // Nothing listens on this port; client creation must still succeed.
        let config = DatabaseConfig {
            uri: "mongodb://127.0.0.1:1/blog".to_string(),
            debug: false,
        };

        let store = MongoStore::connect(&config).await.unwrap();
        assert_eq!(store.database_name(), "blog");
        assert_eq!(store.target(), "mongodb://127.0.0.1:1/blog");
    }

    #[tokio::test]
    async fn test_default_database_name() {
        let config = DatabaseConfig {
            uri: "mongodb://127.0.0.1:1".to_string(),
            debug: true,
        };

        let store = MongoStore::connect(&config).await.unwrap();
        assert_eq!(store.database_name(), "conduit");
    }

    #[tokio::test]
    async fn test_malformed_uri_is_rejected() {
        let config = DatabaseConfig {
            uri: "mongodb://".to_string(),
            debug: false,
        };

        let err = MongoStore::connect(&config).await.unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidUri { .. }));
    }
}
