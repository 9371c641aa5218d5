//! Runtime adapters: task spawning and the connectivity event dispatcher.

use std::future::Future;

#[cfg(not(target_arch = "wasm32"))]
pub mod events;
pub mod tokio_spawner;

#[cfg(not(target_arch = "wasm32"))]
pub use events::{EventDispatcher, EventSender};
pub use tokio_spawner::TokioSpawner;

/// Abstraction for spawning background futures on a runtime.
///
/// Legacy playback schedulers start their per-group actor through it.
pub trait Spawn {
    /// Spawn a future that runs to completion in the background.
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static;
}
