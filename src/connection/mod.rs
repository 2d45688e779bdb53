//! Connection management for MongoDB
//!
//! This module provides:
//! - URI parsing into client options
//! - Connection establishment with retries and a ping check
//! - Collection handles for scans

use mongodb::bson::{Document, doc};
use mongodb::{Client, Collection, options::ClientOptions};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::ConnectionConfig;
use crate::error::{ConnectionError, Result};

/// Delay between connection attempts
const RETRY_DELAY: Duration = Duration::from_millis(500);

/// MongoDB connection manager
pub struct ConnectionManager {
    /// MongoDB client instance
    client: Option<Client>,

    /// Connection configuration
    config: ConnectionConfig,

    /// Connection URI
    uri: String,
}

impl ConnectionManager {
    /// Create a new connection manager
    ///
    /// # Arguments
    /// * `uri` - MongoDB connection URI
    /// * `config` - Connection configuration
    pub fn new(uri: String, config: ConnectionConfig) -> Self {
        Self {
            client: None,
            config,
            uri,
        }
    }

    /// Establish connection to MongoDB
    ///
    /// Retries up to `retry_attempts` times and verifies the server with a ping.
    pub async fn connect(&mut self) -> Result<()> {
        let options = self.client_options().await?;
        let attempts = self.config.retry_attempts.max(1);

        let mut last_error = None;
        for attempt in 1..=attempts {
            match Self::try_connect(options.clone()).await {
                Ok(client) => {
                    info!("Connected to MongoDB (attempt {})", attempt);
                    self.client = Some(client);
                    return Ok(());
                }
                Err(e) => {
                    warn!("Connection attempt {}/{} failed: {}", attempt, attempts, e);
                    last_error = Some(e);
                    if attempt < attempts {
                        tokio::time::sleep(RETRY_DELAY).await;
                    }
                }
            }
        }

        Err(ConnectionError::ConnectionFailed(
            last_error.map(|e| e.to_string()).unwrap_or_default(),
        )
        .into())
    }

    /// Disconnect from MongoDB
    pub async fn disconnect(&mut self) -> Result<()> {
        if let Some(client) = self.client.take() {
            client.shutdown().await;
            debug!("Disconnected from MongoDB");
        }
        Ok(())
    }

    /// Get the MongoDB client
    pub fn get_client(&self) -> Result<&Client> {
        self.client
            .as_ref()
            .ok_or_else(|| ConnectionError::NotConnected.into())
    }

    /// Get a collection handle
    ///
    /// # Arguments
    /// * `database` - Database name
    /// * `collection` - Collection name
    pub fn get_collection(&self, database: &str, collection: &str) -> Result<Collection<Document>> {
        Ok(self.get_client()?.database(database).collection(collection))
    }

    /// Check if currently connected
    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    /// Parse the URI and apply configured settings
    async fn client_options(&self) -> Result<ClientOptions> {
        let mut options = ClientOptions::parse(&self.uri)
            .await
            .map_err(|e| ConnectionError::InvalidUri(e.to_string()))?;

        let timeout = Duration::from_secs(self.config.timeout);
        options.app_name = Some(self.config.app_name.clone());
        options.connect_timeout = Some(timeout);
        options.server_selection_timeout = Some(timeout);
        Ok(options)
    }

    /// Build a client and verify it with a ping
    async fn try_connect(options: ClientOptions) -> Result<Client> {
        let client = Client::with_options(options)?;
        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| ConnectionError::PingFailed(e.to_string()))?;
        Ok(client)
    }
}

/// Extract database name from MongoDB connection URI
///
/// Format: mongodb://[username:password@]host[:port][/database][?options]
pub fn extract_database_from_uri(uri: &str) -> Option<String> {
    let after_scheme = uri.split("://").nth(1)?;
    let path_part = after_scheme.split('/').nth(1)?;
    let db_name = path_part.split('?').next().unwrap_or("");
    if db_name.is_empty() {
        None
    } else {
        Some(db_name.to_string())
    }
}

/// Hide credentials in a URI for logging
pub fn sanitize_uri(uri: &str) -> String {
    if let (Some(proto_end), Some(host_start)) = (uri.find("://"), uri.rfind('@')) {
        if host_start > proto_end {
            return format!("{}***{}", &uri[..proto_end + 3], &uri[host_start..]);
        }
    }
    uri.to_string()
}
