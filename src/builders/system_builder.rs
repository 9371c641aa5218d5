//! Wiring of catalog, broker, recovery decorator, registry and dispatcher.

use std::sync::Arc;

use anyhow::{anyhow, Context};
use tracing::info;

use crate::config::LightsConfig;
use crate::core::broker::{AcquisitionListener, ResourceBroker};
use crate::core::catalog::HardwareCatalog;
use crate::core::channel::{LightChannel, SharedChannel};
use crate::core::device::DeviceDirectory;
use crate::core::error::AppResult;
use crate::core::recovery::RecoveryDecorator;
use crate::core::registry::DeviceRegistry;
use crate::runtime::EventDispatcher;

/// Builder for a [`LightingSystem`].
pub struct LightingSystemBuilder<C: LightChannel + 'static> {
    config: LightsConfig,
    catalog: Option<HardwareCatalog>,
    broker: Option<Arc<dyn ResourceBroker>>,
    channel: Option<C>,
}

impl<C: LightChannel + 'static> LightingSystemBuilder<C> {
    /// Start from a configuration. The standard catalog is used unless
    /// another one is supplied.
    pub fn new(config: LightsConfig) -> Self {
        Self {
            config,
            catalog: None,
            broker: None,
            channel: None,
        }
    }

    /// Use a custom hardware catalog.
    #[must_use]
    pub fn with_catalog(mut self, catalog: HardwareCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Resource broker mediating device ownership.
    #[must_use]
    pub fn with_broker(mut self, broker: Arc<dyn ResourceBroker>) -> Self {
        self.broker = Some(broker);
        self
    }

    /// Raw communication channel wrapped by the recovery decorator.
    #[must_use]
    pub fn with_channel(mut self, channel: C) -> Self {
        self.channel = Some(channel);
        self
    }

    /// Validate the configuration and assemble the system.
    ///
    /// # Errors
    ///
    /// Fails when the configuration is invalid, the broker or channel is
    /// missing, or the dispatcher thread cannot be started.
    pub fn build(self) -> AppResult<LightingSystem<C>> {
        self.config
            .validate()
            .map_err(|e| anyhow!("config invalid: {e}"))?;
        let broker = self.broker.context("a resource broker is required")?;
        let channel = self.channel.context("a light channel is required")?;
        let catalog = self.catalog.unwrap_or_else(HardwareCatalog::standard);

        let directory = DeviceDirectory::new();
        let recovery = Arc::new(RecoveryDecorator::new(
            channel,
            directory.clone(),
            &self.config,
        ));
        let shared: SharedChannel = Arc::clone(&recovery) as SharedChannel;
        let registry = Arc::new(DeviceRegistry::new(
            catalog,
            broker,
            shared,
            directory,
            &self.config,
        ));
        registry.add_listener(Arc::clone(&recovery) as Arc<dyn AcquisitionListener>);

        let events = EventDispatcher::start(Arc::clone(&registry), &self.config)
            .context("failed to start connectivity event dispatcher")?;

        info!(priority = ?self.config.client_priority, "lighting system assembled");
        Ok(LightingSystem {
            config: self.config,
            registry,
            recovery,
            events,
        })
    }
}

/// Assembled lighting core.
pub struct LightingSystem<C: LightChannel + 'static> {
    config: LightsConfig,
    registry: Arc<DeviceRegistry>,
    recovery: Arc<RecoveryDecorator<C>>,
    events: EventDispatcher,
}

impl<C: LightChannel + 'static> LightingSystem<C> {
    /// Configuration the system was built with.
    pub fn config(&self) -> &LightsConfig {
        &self.config
    }

    /// Device registry.
    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    /// Recovery decorator wrapping the raw channel.
    pub fn recovery(&self) -> &Arc<RecoveryDecorator<C>> {
        &self.recovery
    }

    /// Connectivity event dispatcher.
    pub fn events(&self) -> &EventDispatcher {
        &self.events
    }

    /// Drain pending events, stop every scheduler and release all devices.
    pub async fn shutdown(&self) {
        self.events.shutdown();
        self.registry.shutdown().await;
        info!("lighting system shut down");
    }
}
