//! Client builder and factory
//!
//! The `ClientBuilder` provides a fluent API for configuring a client before
//! it is created. It allows you to:
//! - Override any [`ClientConfig`] field
//! - Replace the reconnection strategy or the transport
//! - Configure observability (OpenTelemetry)
//!
//! [`create_client`] is the one-call factory over the same machinery.
//!
//! # Examples
//!
//! ```rust,no_run
//! use socketbase_client::{ClientBuilder, LinearBackoff};
//! use std::time::Duration;
//!
//! # async fn example() -> socketbase_core::Result<()> {
//! // Connect right away
//! let client = ClientBuilder::new("project-hash", "jwt")
//!     .reconnect_delay(Duration::from_millis(500))
//!     .max_reconnect_attempts(10)
//!     .connect()
//!     .await?;
//!
//! // With observability and a custom strategy
//! let client2 = ClientBuilder::new("project-hash", "jwt")
//!     .with_reconnect(Box::new(LinearBackoff::new(Duration::from_secs(2))))
//!     .with_default_observability()
//!     .service_name("chat-frontend")
//!     .connect()
//!     .await?;
//! # Ok(())
//! # }
//! ```

use crate::{
    connection_state::ConnectionManager,
    reconnect::{LinearBackoff, ReconnectionStrategy},
    transport::{Transport, WebSocketTransport},
    ClientConfig, ClientMetrics, SocketBaseClient,
};
use socketbase_core::{Error, ObservabilityConfig, Result};
use std::sync::Arc;
use std::time::Duration;

/// Builder for configuring and creating a SocketBaseClient
pub struct ClientBuilder {
    config: ClientConfig,
    reconnect_strategy: Option<Box<dyn ReconnectionStrategy>>,
    transport: Option<Arc<dyn Transport>>,
    observability_config: Option<ObservabilityConfig>,
    service_name: Option<String>,
}

impl ClientBuilder {
    /// Create a builder with default settings for the given project
    pub fn new(hash: impl Into<String>, jwt: impl Into<String>) -> Self {
        Self::from_config(ClientConfig::new(hash, jwt))
    }

    /// Create a builder starting from an existing configuration
    pub fn from_config(config: ClientConfig) -> Self {
        Self {
            config,
            reconnect_strategy: None,
            transport: None,
            observability_config: None,
            service_name: None,
        }
    }

    /// Base URL of the service
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.config.url = url.into();
        self
    }

    /// Queue frames and reconnect while disconnected (default on)
    pub fn auto_reconnect(mut self, enabled: bool) -> Self {
        self.config.auto_reconnect = enabled;
        self
    }

    /// Start connecting from `build()` (default on)
    pub fn auto_connect(mut self, enabled: bool) -> Self {
        self.config.auto_connect = enabled;
        self
    }

    /// Reconnection budget after an unexpected close
    pub fn max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.config.max_reconnect_attempts = attempts;
        self
    }

    /// Linear backoff unit
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.config.reconnect_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Fail join/leave calls that are not acknowledged in time
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    /// Use a custom reconnection strategy instead of linear backoff
    pub fn with_reconnect(mut self, strategy: Box<dyn ReconnectionStrategy>) -> Self {
        self.reconnect_strategy = Some(strategy);
        self
    }

    /// Use a custom transport instead of WebSocket
    pub fn with_transport(mut self, transport: impl Transport) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Enable OpenTelemetry observability with custom configuration
    pub fn with_observability(mut self, config: ObservabilityConfig) -> Self {
        self.observability_config = Some(config);
        self
    }

    /// Enable OpenTelemetry observability with default configuration
    pub fn with_default_observability(mut self) -> Self {
        self.observability_config = Some(ObservabilityConfig::default());
        self
    }

    /// Set service name for observability (used if observability is enabled)
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }

    /// Create the client
    ///
    /// With `auto_connect` on, a connection attempt is spawned on the current
    /// Tokio runtime; its failure is logged and retried per the reconnection
    /// policy, not returned here.
    ///
    /// # Errors
    ///
    /// `Error::Config` when the hash or JWT is missing, the URL is unusable,
    /// or `auto_connect` is on outside a Tokio runtime. `Error::Internal` if
    /// observability fails to initialize.
    pub fn build(self) -> Result<SocketBaseClient> {
        self.config.validate()?;

        let runtime = if self.config.auto_connect {
            Some(tokio::runtime::Handle::try_current().map_err(|_| {
                Error::Config("auto_connect requires a running Tokio runtime".to_string())
            })?)
        } else {
            None
        };

        // Initialize observability if configured
        let metrics = if let Some(mut config) = self.observability_config {
            if let Some(name) = self.service_name {
                config.service_name = name;
            }

            socketbase_core::init_observability(config.clone()).map_err(|e| {
                Error::Internal(format!("Failed to initialize observability: {}", e))
            })?;

            Some(Arc::new(ClientMetrics::new(config.service_name)))
        } else {
            None
        };

        let strategy = self.reconnect_strategy.unwrap_or_else(|| {
            Box::new(
                LinearBackoff::new(self.config.reconnect_delay())
                    .with_max_attempts(self.config.max_reconnect_attempts),
            )
        });
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(WebSocketTransport::new()));

        let client = SocketBaseClient::from_parts(
            self.config,
            ConnectionManager::new(strategy),
            transport,
            metrics,
        );

        if let Some(runtime) = runtime {
            let connecting = client.connect_boxed();
            runtime.spawn(async move {
                if let Err(e) = connecting.await {
                    tracing::warn!(error = %e, "Automatic connect failed");
                }
            });
        }

        Ok(client)
    }

    /// Build the client and wait for the first connection
    pub async fn connect(mut self) -> Result<SocketBaseClient> {
        self.config.auto_connect = false;
        let client = self.build()?;
        client.connect().await?;
        Ok(client)
    }
}

/// Validate `config` and create a client, connecting in the background when
/// `auto_connect` is set
pub fn create_client(config: ClientConfig) -> Result<SocketBaseClient> {
    ClientBuilder::from_config(config).build()
}
