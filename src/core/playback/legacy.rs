//! Timer-driven scheduler for devices without an on-device frame queue.
//!
//! Each group is owned by one actor task. External updates and deadline
//! expiry are handled in the same loop, so the "deadline pending" state never
//! needs a lock and a second command can never start while one is in flight.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, warn};

use super::{PlaybackOutcome, PlaybackScheduler};
use crate::core::channel::{SequenceMode, SharedChannel};
use crate::core::error::{DeviceError, LightsError};
use crate::core::frames::{FrameBlender, LightSequence};
use crate::runtime::Spawn;
use crate::util::types::GroupNumber;

enum Command {
    Update {
        restart: bool,
        reply: oneshot::Sender<Result<PlaybackOutcome, LightsError>>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Legacy scheduler for one group. Cheap front end of the group's actor.
pub struct LegacyScheduler {
    feature: String,
    group: GroupNumber,
    tx: mpsc::UnboundedSender<Command>,
    active_frame_count: Arc<AtomicUsize>,
    shut_down: AtomicBool,
}

impl LegacyScheduler {
    /// Start the group's actor on `spawner`.
    pub fn spawn<S: Spawn>(
        spawner: &S,
        feature: &str,
        group: GroupNumber,
        channel: SharedChannel,
        blender: Arc<dyn FrameBlender>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let active_frame_count = Arc::new(AtomicUsize::new(0));
        let actor = GroupActor {
            feature: feature.to_string(),
            group,
            channel,
            blender,
            active_frame_count: Arc::clone(&active_frame_count),
            deadline: None,
        };
        spawner.spawn(actor.run(rx));

        Self {
            feature: feature.to_string(),
            group,
            tx,
            active_frame_count,
            shut_down: AtomicBool::new(false),
        }
    }

    /// Queue a restart without waiting for its outcome. Used after the
    /// device is reacquired, from contexts that cannot await.
    pub fn request_restart(&self) {
        if self.shut_down.load(Ordering::Acquire) {
            return;
        }
        let (reply, _) = oneshot::channel();
        if self
            .tx
            .send(Command::Update {
                restart: true,
                reply,
            })
            .is_err()
        {
            debug!(feature = %self.feature, group = self.group, "restart dropped, actor gone");
        }
    }

    fn shut_down_error(&self) -> LightsError {
        LightsError::SchedulerShutdown {
            feature: self.feature.clone(),
            group: self.group,
        }
    }
}

#[async_trait]
impl PlaybackScheduler for LegacyScheduler {
    async fn update_device(&self, restart: bool) -> Result<PlaybackOutcome, LightsError> {
        if self.shut_down.load(Ordering::Acquire) {
            return Err(self.shut_down_error());
        }
        let (reply, response) = oneshot::channel();
        self.tx
            .send(Command::Update { restart, reply })
            .map_err(|_| self.shut_down_error())?;
        response.await.map_err(|_| self.shut_down_error())?
    }

    async fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }
        let (reply, done) = oneshot::channel();
        if self.tx.send(Command::Shutdown { reply }).is_ok() {
            let _ = done.await;
        }
        self.active_frame_count.store(0, Ordering::Release);
        debug!(feature = %self.feature, group = self.group, "legacy scheduler shut down");
    }

    fn active_frame_count(&self) -> usize {
        self.active_frame_count.load(Ordering::Acquire)
    }
}

struct GroupActor {
    feature: String,
    group: GroupNumber,
    channel: SharedChannel,
    blender: Arc<dyn FrameBlender>,
    active_frame_count: Arc<AtomicUsize>,
    deadline: Option<Instant>,
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

impl GroupActor {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        loop {
            tokio::select! {
                biased;
                command = rx.recv() => match command {
                    Some(Command::Update { restart, reply }) => {
                        let _ = reply.send(self.update(restart));
                    }
                    Some(Command::Shutdown { reply }) => {
                        self.deadline = None;
                        let _ = reply.send(());
                        break;
                    }
                    None => break,
                },
                () = wait_for(self.deadline) => {
                    self.deadline = None;
                    self.on_deadline();
                }
            }
        }
        debug!(feature = %self.feature, group = self.group, "legacy scheduler actor stopped");
    }

    fn active(&self) -> usize {
        self.active_frame_count.load(Ordering::Acquire)
    }

    fn update(&mut self, restart: bool) -> Result<PlaybackOutcome, LightsError> {
        let active = self.active();
        let sequence = if restart {
            self.blender.full_sequence(self.group)
        } else {
            self.blender.continue_sequence(self.group, active)
        };
        if sequence.is_empty() {
            self.active_frame_count.store(0, Ordering::Release);
            return Ok(PlaybackOutcome::Idle);
        }

        if !restart && sequence.frame_count() != active {
            warn!(
                feature = %self.feature,
                group = self.group,
                active,
                offered = sequence.frame_count(),
                "continuation frame count mismatch, update skipped"
            );
            return Ok(PlaybackOutcome::Skipped {
                active,
                offered: sequence.frame_count(),
            });
        }

        let mode = if restart {
            SequenceMode::Restart
        } else {
            SequenceMode::Continue
        };
        let outcome = self.send(&sequence, mode)?;
        if restart || self.deadline.is_none() {
            self.arm(&sequence);
        }
        Ok(outcome)
    }

    fn on_deadline(&mut self) {
        let sequence = self.blender.full_sequence(self.group);
        if sequence.is_empty() {
            debug!(feature = %self.feature, group = self.group, "sequence finished, group idle");
            self.active_frame_count.store(0, Ordering::Release);
            return;
        }
        match self.send(&sequence, SequenceMode::Restart) {
            Ok(_) => self.arm(&sequence),
            Err(e) => {
                self.active_frame_count.store(0, Ordering::Release);
                warn!(
                    feature = %self.feature,
                    group = self.group,
                    error = %e,
                    "sequence resend failed, group idle"
                );
            }
        }
    }

    fn send(
        &self,
        sequence: &LightSequence,
        mode: SequenceMode,
    ) -> Result<PlaybackOutcome, LightsError> {
        self.active_frame_count
            .store(sequence.frame_count(), Ordering::Release);
        match self
            .channel
            .start_sequence(&self.feature, self.group, sequence, mode)
        {
            Ok(()) => Ok(PlaybackOutcome::Sent {
                frame_count: sequence.frame_count(),
            }),
            Err(DeviceError::NotOwned) => {
                debug!(feature = %self.feature, group = self.group, "sequence dropped, device not owned");
                Ok(PlaybackOutcome::Dropped)
            }
            Err(e) => Err(LightsError::device(&self.feature, e)),
        }
    }

    fn arm(&mut self, sequence: &LightSequence) {
        let duration = sequence.total_display_time();
        self.deadline = Some(Instant::now() + duration);
        debug!(
            feature = %self.feature,
            group = self.group,
            ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            "sequence deadline armed"
        );
    }
}
