//! Transition events and notifiers.
//!
//! An event is emitted after every committed transition, including creation
//! (where `old_state` is `None`). Consumers use them to send mail, keep an
//! audit trail, refresh dashboards, etc.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::info;

/// A committed state change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionEvent {
  pub entity_type: String,
  pub instance_id: String,
  /// Set when the transition wrote a fresh record replacing this one.
  pub supersedes: Option<String>,
  pub old_state: Option<String>,
  pub new_state: String,
  pub role: String,
  pub step_index: usize,
}

/// Trait for receiving transition events.
///
/// The engine calls `notify` once the new state is stored. Delivery is fire
/// and forget: nothing a notifier does can undo the transition.
pub trait TransitionNotifier: Send + Sync {
  fn notify(&self, event: TransitionEvent);
}

impl<N: TransitionNotifier + ?Sized> TransitionNotifier for Arc<N> {
  fn notify(&self, event: TransitionEvent) {
    (**self).notify(event)
  }
}

/// A no-op notifier that discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl TransitionNotifier for NoopNotifier {
  fn notify(&self, _event: TransitionEvent) {}
}

/// A notifier that sends events to an unbounded channel.
///
/// Use this when events are consumed asynchronously (mailer, history writer).
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  sender: mpsc::UnboundedSender<TransitionEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<TransitionEvent>) -> Self {
    Self { sender }
  }
}

impl TransitionNotifier for ChannelNotifier {
  fn notify(&self, event: TransitionEvent) {
    // Ignore send errors - receiver may have been dropped
    let _ = self.sender.send(event);
  }
}

/// A notifier that writes one structured audit line per transition.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl TransitionNotifier for LogNotifier {
  fn notify(&self, event: TransitionEvent) {
    info!(
      target: "flowdesk::audit",
      entity_type = %event.entity_type,
      instance_id = %event.instance_id,
      supersedes = ?event.supersedes,
      old_state = ?event.old_state,
      new_state = %event.new_state,
      role = %event.role,
      step_index = event.step_index,
      "state changed"
    );
  }
}
