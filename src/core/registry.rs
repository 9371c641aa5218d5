//! Device registry and acquisition manager.
//!
//! The registry creates one [`DeviceHandle`] per requested hardware type,
//! keeps connected-but-unrequested devices as free devices, and mediates
//! exclusive ownership with the [`ResourceBroker`]. Acquisition failures are
//! recorded on the handle; only integration mistakes (unknown hardware type,
//! capability mismatch, coupled conflict) are returned as errors.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::config::LightsConfig;
use crate::core::broker::{AcquireResponse, AcquisitionListener, ConnectivityEvent, ResourceBroker};
use crate::core::catalog::{Capability, HardwareCatalog, HardwareType};
use crate::core::channel::SharedChannel;
use crate::core::device::{DeviceDirectory, DeviceHandle, DeviceSnapshot, FailureReason};
use crate::core::error::LightsError;
use crate::util::types::{DeviceKind, Priority};

/// Registry of light-device handles.
pub struct DeviceRegistry {
    catalog: HardwareCatalog,
    broker: Arc<dyn ResourceBroker>,
    channel: SharedChannel,
    priority: Priority,
    /// Registered and free handles by feature name.
    directory: DeviceDirectory,
    /// Registered handles by hardware type.
    by_type: RwLock<HashMap<HardwareType, DeviceHandle>>,
    listeners: RwLock<Vec<Arc<dyn AcquisitionListener>>>,
    /// Serializes every operation that mutates the tables or acquisition
    /// state: registration, connectivity handlers, blank scan and release.
    registration: Mutex<()>,
}

impl DeviceRegistry {
    /// Create a registry.
    ///
    /// `channel` is the channel handles write through (normally the recovery
    /// decorator) and `directory` the table shared with it.
    pub fn new(
        catalog: HardwareCatalog,
        broker: Arc<dyn ResourceBroker>,
        channel: SharedChannel,
        directory: DeviceDirectory,
        config: &LightsConfig,
    ) -> Self {
        Self {
            catalog,
            broker,
            channel,
            priority: config.client_priority,
            directory,
            by_type: RwLock::new(HashMap::new()),
            listeners: RwLock::new(Vec::new()),
            registration: Mutex::new(()),
        }
    }

    /// Register a listener notified after every successful acquisition.
    pub fn add_listener(&self, listener: Arc<dyn AcquisitionListener>) {
        self.listeners.write().push(listener);
    }

    /// Read-only view of the feature table.
    pub fn directory(&self) -> &DeviceDirectory {
        &self.directory
    }

    /// Hardware catalog in use.
    pub fn catalog(&self) -> &HardwareCatalog {
        &self.catalog
    }

    /// Registered handle for a hardware type.
    pub fn get(&self, hardware_type: HardwareType) -> Option<DeviceHandle> {
        self.by_type.read().get(&hardware_type).cloned()
    }

    /// Return the handle for `hardware_type`, creating and acquiring it on
    /// first request.
    pub fn get_or_create(
        &self,
        hardware_type: HardwareType,
        expected: Capability,
        allow_coupling: bool,
    ) -> Result<DeviceHandle, LightsError> {
        let _registering = self.registration.lock();

        if let Some(existing) = self.get(hardware_type) {
            if !existing.capabilities().contains(expected) {
                return Err(LightsError::CapabilityMismatch {
                    hardware_type,
                    requested: expected,
                });
            }
            return Ok(existing);
        }

        let descriptor = self
            .catalog
            .get(hardware_type)
            .ok_or(LightsError::UnknownHardwareType(hardware_type))?;
        let feature = descriptor.feature_name;

        if let Some(coupled) = descriptor.coupled_feature_name {
            if !allow_coupling && self.is_requested(coupled) {
                return Err(LightsError::CoupledConflict {
                    feature: feature.to_string(),
                    coupled: coupled.to_string(),
                });
            }
        }

        let description = self.broker.feature_description(feature);
        let handle = (descriptor.factory)(
            hardware_type,
            feature,
            description,
            Arc::clone(&self.channel),
        );
        if !handle.capabilities().contains(expected) {
            return Err(LightsError::CapabilityMismatch {
                hardware_type,
                requested: expected,
            });
        }

        if let Some(free) = self.directory.get(feature) {
            debug!(feature, "promoting free device");
            handle.adopt_state(&free);
            handle.refresh_description(description);
        }

        self.directory.insert(handle.clone());
        self.by_type.write().insert(hardware_type, handle.clone());
        info!(feature, ?hardware_type, "registered light device");

        if !handle.is_acquired() {
            self.acquire(&handle, descriptor.device_kind());
        }
        Ok(handle)
    }

    fn is_requested(&self, feature: &str) -> bool {
        self.directory.get(feature).is_some_and(|h| !h.is_free())
    }

    fn device_kind(&self, feature: &str) -> DeviceKind {
        self.catalog
            .by_feature(feature)
            .map_or(DeviceKind::PeripheralLight, |d| d.device_kind())
    }

    /// Ask the broker for ownership of `handle`. Returns whether the handle
    /// is acquired afterwards.
    fn acquire(&self, handle: &DeviceHandle, kind: DeviceKind) -> bool {
        let feature = handle.feature_name();
        match self.broker.request_acquire(kind, feature, self.priority) {
            AcquireResponse::Granted => match self.broker.feature_description(feature) {
                Some(description) => {
                    if handle.mark_acquired(description) {
                        info!(feature, "acquired light device");
                        self.notify_acquired(&handle);
                    }
                    true
                }
                None => {
                    warn!(feature, "acquisition granted for a disconnected device");
                    self.broker.release(kind, feature);
                    handle.mark_unacquired(Some(FailureReason::DeviceAbsent), None);
                    false
                }
            },
            AcquireResponse::Denied(reason) => {
                warn!(feature, ?reason, "light device acquisition denied");
                handle.mark_unacquired(Some(reason), handle.description());
                false
            }
        }
    }

    /// Replay recorded commands through the listeners, then restart any
    /// attached playback so streamed content comes back too.
    fn notify_acquired(&self, handle: &DeviceHandle) {
        let feature = handle.feature_name();
        let listeners: Vec<_> = self.listeners.read().clone();
        for listener in listeners {
            if let Err(e) = listener.device_acquired(feature) {
                error!(feature, error = %e, "acquisition listener failed");
            }
        }
        handle.restart_playback();
    }

    /// Give every acquired device back to the broker.
    pub fn release_all(&self) {
        let _serialized = self.registration.lock();
        for handle in self.directory.handles() {
            if handle.is_acquired() {
                let feature = handle.feature_name();
                self.broker.release(self.device_kind(feature), feature);
                handle.mark_unacquired(Some(FailureReason::Released), handle.description());
                debug!(feature, "released light device");
            }
        }
    }

    /// Stop every playback scheduler, then release all devices.
    pub async fn shutdown(&self) {
        for handle in self.directory.handles() {
            handle.shutdown_playback().await;
        }
        self.release_all();
        info!("device registry shut down");
    }

    /// Dispatch one connectivity event. Each handler takes the registry lock,
    /// so events never interleave with registration.
    pub fn handle_event(&self, event: ConnectivityEvent) {
        debug!(?event, "connectivity event");
        match event {
            ConnectivityEvent::Connected { feature } => self.on_connected(&feature),
            ConnectivityEvent::Acquired { feature } => self.on_acquired(&feature),
            ConnectivityEvent::Released { feature, reason } => self.on_released(&feature, reason),
            ConnectivityEvent::Removed { feature } => self.on_removed(&feature),
        }
    }

    fn handle_or_free(&self, feature: &str) -> DeviceHandle {
        if let Some(handle) = self.directory.get(feature) {
            return handle;
        }
        let handle = DeviceHandle::free(feature, None, Arc::clone(&self.channel));
        self.directory.insert(handle.clone());
        debug!(feature, "tracking free device");
        handle
    }

    /// A device was plugged in.
    pub fn on_connected(&self, feature: &str) {
        let _serialized = self.registration.lock();
        let handle = self.handle_or_free(feature);
        handle.refresh_description(self.broker.feature_description(feature));
        if !handle.is_free() && !handle.is_acquired() {
            self.acquire(&handle, self.device_kind(feature));
        }
    }

    /// The broker granted this client ownership.
    pub fn on_acquired(&self, feature: &str) {
        let _serialized = self.registration.lock();
        let handle = self.handle_or_free(feature);
        match self.broker.feature_description(feature) {
            Some(description) => {
                if handle.mark_acquired(description) {
                    info!(feature, "light device reacquired");
                    self.notify_acquired(&handle);
                }
            }
            None => {
                warn!(feature, "acquired event without a feature description");
                handle.mark_unacquired(Some(FailureReason::DeviceAbsent), None);
            }
        }
    }

    /// The broker took ownership away.
    pub fn on_released(&self, feature: &str, reason: FailureReason) {
        let _serialized = self.registration.lock();
        let handle = self.handle_or_free(feature);
        info!(feature, ?reason, "light device released");
        handle.mark_unacquired(Some(reason), self.broker.feature_description(feature));
    }

    /// A device was unplugged.
    pub fn on_removed(&self, feature: &str) {
        let _serialized = self.registration.lock();
        match self.directory.get(feature) {
            Some(handle) => {
                info!(feature, "light device removed");
                handle.mark_unacquired(Some(FailureReason::DeviceAbsent), None);
            }
            None => debug!(feature, "removal of an unknown device ignored"),
        }
    }

    /// Devices without client content that this client owns, ready for an
    /// ambient color.
    ///
    /// A device coupled to another feature is only returned when the partner
    /// is blank too (or never requested), and a blank pair is returned once,
    /// first-seen feature winning.
    pub fn blank_devices(&self) -> Vec<DeviceHandle> {
        let _serialized = self.registration.lock();
        let mut blank = Vec::new();
        let mut taken: HashSet<String> = HashSet::new();

        for handle in self.directory.handles() {
            if handle.has_content() {
                continue;
            }
            let feature = handle.feature_name();

            if let Some(partner) = self.catalog.coupled_feature(feature) {
                if taken.contains(partner) {
                    continue;
                }
                if self
                    .directory
                    .get(partner)
                    .is_some_and(|p| p.has_content())
                {
                    debug!(feature, partner, "partner shows content, not blank");
                    continue;
                }
            }

            if !handle.is_acquired() && !self.acquire(&handle, self.device_kind(feature)) {
                continue;
            }
            taken.insert(feature.to_string());
            blank.push(handle);
        }
        blank
    }

    /// Diagnostic snapshot of every known device.
    pub fn snapshot(&self) -> Vec<DeviceSnapshot> {
        self.directory
            .handles()
            .iter()
            .map(DeviceHandle::snapshot)
            .collect()
    }
}
