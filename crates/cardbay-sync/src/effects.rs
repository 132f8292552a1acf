//! User-facing side effects, decoupled from the cache transitions that
//! produce them. Pipelines return a list of [`Effect`]s; [`run_effects`]
//! fires them through an [`EffectSink`] after the caches are already
//! consistent, so a blocked sound or a failed toast can never abort a sync.

use thiserror::Error;
use tracing::debug;

use cardbay_types::models::{ChatMessage, ConversationSummary, Notification};

/// A side effect requested by a pipeline.
#[derive(Debug, Clone)]
pub enum Effect {
    /// Sound + transient toast for a fresh notification.
    NotificationAlert(Notification),
    /// Sound for a chat message the user is not currently looking at.
    MessageAlert(ChatMessage),
    /// Admin-side "ding" for inbox activity outside the viewed room.
    InboxAlert(ConversationSummary),
    /// Re-fetch the authoritative profile/balance view.
    RefreshProfile,
}

#[derive(Debug, Error)]
pub enum AlertError {
    /// Browser/OS refused playback (autoplay policy, muted device, ...).
    #[error("alert playback blocked: {0}")]
    Blocked(String),
    #[error("alert sink unavailable")]
    Unavailable,
}

/// Presentation seam. Implementations wrap whatever audio/toast primitives
/// and REST client the host application uses; this crate only needs the
/// "notify user" contract.
pub trait EffectSink: Send + Sync {
    fn notification_alert(&self, notification: &Notification) -> Result<(), AlertError>;
    fn message_alert(&self, message: &ChatMessage) -> Result<(), AlertError>;
    fn inbox_alert(&self, conversation: &ConversationSummary) -> Result<(), AlertError>;
    fn refresh_profile(&self) -> Result<(), AlertError>;
}

/// Fire every effect, logging and discarding failures.
pub fn run_effects(sink: &dyn EffectSink, effects: Vec<Effect>) {
    for effect in effects {
        let result = match &effect {
            Effect::NotificationAlert(n) => sink.notification_alert(n),
            Effect::MessageAlert(m) => sink.message_alert(m),
            Effect::InboxAlert(c) => sink.inbox_alert(c),
            Effect::RefreshProfile => sink.refresh_profile(),
        };
        if let Err(err) = result {
            debug!("effect {:?} failed: {}", effect, err);
        }
    }
}

/// Sink that discards every effect. For tests and headless sessions.
pub struct NullSink;

impl EffectSink for NullSink {
    fn notification_alert(&self, _notification: &Notification) -> Result<(), AlertError> {
        Ok(())
    }

    fn message_alert(&self, _message: &ChatMessage) -> Result<(), AlertError> {
        Ok(())
    }

    fn inbox_alert(&self, _conversation: &ConversationSummary) -> Result<(), AlertError> {
        Ok(())
    }

    fn refresh_profile(&self) -> Result<(), AlertError> {
        Ok(())
    }
}
