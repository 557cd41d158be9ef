//! Notifier trait for security events
//!
//! Fire and forget: implementations log their own failures. An undeliverable
//! notification never fails the authentication operation that raised it.

use crate::domain::event::SecurityEvent;
use crate::domain::value_object::Email;

/// Outbound channel for security notifications
#[trait_variant::make(Notifier: Send)]
pub trait LocalNotifier {
    /// Deliver `event` to `recipient` with event-specific details
    async fn notify(&self, event: SecurityEvent, recipient: &Email, payload: serde_json::Value);
}

/// Notifier that discards everything (tests, minimal deployments)
#[derive(Debug, Clone, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    async fn notify(&self, event: SecurityEvent, recipient: &Email, _payload: serde_json::Value) {
        tracing::debug!(
            event = event.as_str(),
            recipient = recipient.as_str(),
            "Notification discarded"
        );
    }
}
