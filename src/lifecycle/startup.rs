//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate configuration
//! - Open the shared database connection before any domain code runs
//! - Run domain setup hooks in registration order
//! - Build the application, bind the listener and spawn the serve task
//! - Spawn the expired-session sweep, stopped with the server
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - A failure after the database is open closes it before returning
//! - The listener binds last (traffic only when ready)

use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::validation::validate_config;
use crate::config::{AppConfig, ConfigError};
use crate::database::{self, DatabaseError, DocumentStore};
use crate::http::error::BoxError;
use crate::http::server::{build_app, AppState};
use crate::lifecycle::shutdown::{ServerHandle, Shutdown};
use crate::session::SessionManager;

/// Domain initializer run once at startup, e.g. model registration or
/// authentication strategy setup.
#[async_trait]
pub trait DomainSetup: Send + Sync {
    fn name(&self) -> &str;

    async fn setup(&self, state: &AppState) -> Result<(), BoxError>;
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("setup hook '{name}' failed: {source}")]
    Setup {
        name: String,
        #[source]
        source: BoxError,
    },

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },
}

/// Assembles and starts the server.
pub struct ServerBuilder {
    config: AppConfig,
    routes: Router<AppState>,
    hooks: Vec<Box<dyn DomainSetup>>,
}

impl ServerBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            routes: Router::new(),
            hooks: Vec::new(),
        }
    }

    /// Merge routes into the application router.
    pub fn routes(mut self, routes: Router<AppState>) -> Self {
        self.routes = self.routes.merge(routes);
        self
    }

    /// Register a setup hook. Hooks run in registration order.
    pub fn setup(mut self, hook: impl DomainSetup + 'static) -> Self {
        self.hooks.push(Box::new(hook));
        self
    }

    /// Connect to the configured database and start serving.
    pub async fn start(self) -> Result<ServerHandle, StartupError> {
        validate(&self.config)?;
        let store = database::connect(&self.config.database).await?;
        self.launch(store).await
    }

    /// Start serving on an already opened store.
    pub async fn start_with_store(
        self,
        store: Arc<dyn DocumentStore>,
    ) -> Result<ServerHandle, StartupError> {
        validate(&self.config)?;
        self.launch(store).await
    }

    async fn launch(self, store: Arc<dyn DocumentStore>) -> Result<ServerHandle, StartupError> {
        let state = AppState::new(self.config.clone(), store.clone());

        let listener = match self.prepare(&state).await {
            Ok(listener) => listener,
            Err(e) => {
                store.close().await;
                return Err(e);
            }
        };

        let address = self.config.server.bind_address();
        let local_addr = match listener.local_addr() {
            Ok(addr) => addr,
            Err(source) => {
                store.close().await;
                return Err(StartupError::Bind { address, source });
            }
        };

        let shutdown = Shutdown::new();

        let sessions = SessionManager::new(&self.config.session);
        let sessions_store = sessions.store().clone();
        let sweep_period = sessions_store.max_age();
        tokio::spawn(sessions_store.run_sweeper(sweep_period, shutdown.subscribe()));

        let app = build_app(&self.config, state, sessions, self.routes);

        let mut stop = shutdown.subscribe();
        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = stop.recv().await;
                })
                .await
        });

        tracing::info!(
            address = %local_addr,
            environment = ?self.config.environment,
            "Listening on port {}",
            local_addr.port()
        );

        Ok(ServerHandle::new(local_addr, shutdown, task, store))
    }

    /// Run the hooks, then bind.
    async fn prepare(&self, state: &AppState) -> Result<TcpListener, StartupError> {
        for hook in &self.hooks {
            tracing::info!(hook = hook.name(), "Running setup hook");
            hook.setup(state)
                .await
                .map_err(|source| StartupError::Setup {
                    name: hook.name().to_string(),
                    source,
                })?;
        }

        let address = self.config.server.bind_address();
        TcpListener::bind(&address)
            .await
            .map_err(|source| StartupError::Bind { address, source })
    }
}

fn validate(config: &AppConfig) -> Result<(), StartupError> {
    validate_config(config).map_err(|errors| StartupError::Config(ConfigError::Validation(errors)))
}

/// Start a server for `config` serving `routes`, with no setup hooks.
pub async fn start(config: AppConfig, routes: Router<AppState>) -> Result<ServerHandle, StartupError> {
    ServerBuilder::new(config).routes(routes).start().await
}
