//! Connectivity event dispatcher.
//!
//! Broker callbacks arrive on arbitrary threads. They are funnelled through a
//! bounded channel into one dedicated OS thread that applies them to the
//! registry in arrival order, so registry state changes never race each other.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::LightsConfig;
use crate::core::broker::ConnectivityEvent;
use crate::core::error::LightsError;
use crate::core::registry::DeviceRegistry;

enum Envelope {
    Event(ConnectivityEvent),
    Stop,
}

/// Cloneable producer side of the dispatcher.
#[derive(Clone)]
pub struct EventSender {
    tx: Sender<Envelope>,
    closed: Arc<AtomicBool>,
}

impl EventSender {
    /// Queue an event. Blocks while the channel is full.
    ///
    /// # Errors
    ///
    /// `LightsError::EventChannelClosed` once the dispatcher has stopped.
    pub fn send(&self, event: ConnectivityEvent) -> Result<(), LightsError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(LightsError::EventChannelClosed);
        }
        self.tx
            .send(Envelope::Event(event))
            .map_err(|_| LightsError::EventChannelClosed)
    }
}

/// Dedicated thread applying connectivity events to a [`DeviceRegistry`].
pub struct EventDispatcher {
    sender: EventSender,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl EventDispatcher {
    /// Start the dispatcher thread.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the thread cannot be spawned.
    pub fn start(registry: Arc<DeviceRegistry>, config: &LightsConfig) -> std::io::Result<Self> {
        let (tx, rx) = bounded(config.event_channel_capacity);
        let worker = thread::Builder::new()
            .name(config.dispatcher_thread_name.clone())
            .spawn(move || dispatch_loop(&registry, &rx))?;

        info!(
            thread = %config.dispatcher_thread_name,
            capacity = config.event_channel_capacity,
            "connectivity event dispatcher started"
        );
        Ok(Self {
            sender: EventSender {
                tx,
                closed: Arc::new(AtomicBool::new(false)),
            },
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Producer handle for broker callbacks.
    pub fn sender(&self) -> EventSender {
        self.sender.clone()
    }

    /// Queue an event.
    ///
    /// # Errors
    ///
    /// `LightsError::EventChannelClosed` once the dispatcher has stopped.
    pub fn send(&self, event: ConnectivityEvent) -> Result<(), LightsError> {
        self.sender.send(event)
    }

    /// Whether the dispatcher has been shut down.
    pub fn is_closed(&self) -> bool {
        self.sender.closed.load(Ordering::Acquire)
    }

    /// Apply every queued event, then stop and join the thread. Idempotent.
    pub fn shutdown(&self) {
        if self.sender.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let _ = self.sender.tx.send(Envelope::Stop);
        if let Some(worker) = self.worker.lock().take() {
            if worker.join().is_err() {
                warn!("connectivity event dispatcher panicked");
            }
        }
        info!("connectivity event dispatcher stopped");
    }
}

impl Drop for EventDispatcher {
    fn drop(&mut self) {
        // Signal the thread but never block in drop.
        if !self.sender.closed.swap(true, Ordering::AcqRel) {
            let _ = self.sender.tx.try_send(Envelope::Stop);
            debug!("event dispatcher dropped without explicit shutdown");
        }
    }
}

fn dispatch_loop(registry: &DeviceRegistry, rx: &Receiver<Envelope>) {
    debug!("event dispatcher thread started");
    while let Ok(envelope) = rx.recv() {
        match envelope {
            Envelope::Event(event) => registry.handle_event(event),
            Envelope::Stop => break,
        }
    }
    debug!("event dispatcher thread exiting");
}
