use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{ChatMessage, ConversationSummary, Notification, SenderType, UnreadCounts};

/// Server-pushed events, decoded from named transport frames.
///
/// This is the single validation boundary for inbound payloads: anything that
/// does not decode into one of these variants is dropped before it reaches a
/// pipeline, so the pipelines never see a malformed payload.
#[derive(Debug, Clone)]
pub enum ServerEvent {
    /// A new notification arrived, together with the authoritative unread
    /// counters recomputed by the server.
    NewNotification {
        notification: Notification,
        counts: UnreadCounts,
    },

    /// Someone started or stopped typing in a conversation.
    TypingUpdate {
        order_id: Uuid,
        user_id: Uuid,
        is_typing: bool,
        sender_type: SenderType,
    },

    /// A new chat message was posted to a conversation.
    NewMessage { message: ChatMessage },

    /// Canonical message history for the conversation the viewer has open,
    /// sent after joining its room.
    OrderHistory(Vec<ChatMessage>),

    /// Server-side enrichment of an already-delivered message (delivery or
    /// read status, attachment processing, ...).
    MessageAppended(ChatMessage),

    /// The admin inbox summary for one conversation changed.
    AdminChatUpdate { conversation: ConversationSummary },
}

#[derive(Debug, Deserialize)]
struct NewNotificationPayload {
    notification: Notification,
    counts: UnreadCounts,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TypingUpdatePayload {
    order_id: Uuid,
    user_id: Uuid,
    is_typing: bool,
    sender_type: SenderType,
}

#[derive(Debug, Deserialize)]
struct NewMessagePayload {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct AdminChatUpdatePayload {
    conversation: ConversationSummary,
}

impl ServerEvent {
    /// Decode a named frame into an event. Returns `None` for unknown event
    /// names and for payloads that do not match the expected shape (missing
    /// `notification`, non-array `order_history`, absent `orderId`, ...) —
    /// the caller is expected to drop those silently.
    pub fn decode(event: &str, payload: serde_json::Value) -> Option<ServerEvent> {
        match event {
            "new_notification" => serde_json::from_value::<NewNotificationPayload>(payload)
                .ok()
                .map(|p| ServerEvent::NewNotification {
                    notification: p.notification,
                    counts: p.counts,
                }),
            "typing_update" => serde_json::from_value::<TypingUpdatePayload>(payload)
                .ok()
                .map(|p| ServerEvent::TypingUpdate {
                    order_id: p.order_id,
                    user_id: p.user_id,
                    is_typing: p.is_typing,
                    sender_type: p.sender_type,
                }),
            "new_message" => serde_json::from_value::<NewMessagePayload>(payload)
                .ok()
                .map(|p| ServerEvent::NewMessage { message: p.message }),
            "order_history" => serde_json::from_value::<Vec<ChatMessage>>(payload)
                .ok()
                .map(ServerEvent::OrderHistory),
            "message_appended" => serde_json::from_value::<ChatMessage>(payload)
                .ok()
                .map(ServerEvent::MessageAppended),
            "admin_chat_update" => serde_json::from_value::<AdminChatUpdatePayload>(payload)
                .ok()
                .map(|p| ServerEvent::AdminChatUpdate {
                    conversation: p.conversation,
                }),
            _ => None,
        }
    }
}

/// Commands sent FROM client TO server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
#[serde(rename_all_fields = "camelCase")]
pub enum ClientCommand {
    /// Indicate typing state in a conversation.
    Typing { order_id: Uuid, is_typing: bool },

    /// Join a conversation room; the server answers with `order_history`.
    JoinOrder { order_id: Uuid },

    /// Leave a conversation room.
    LeaveOrder { order_id: Uuid },
}

/// Raw signals surfaced by a transport implementation. Lifecycle signals map
/// to the transport's own `connect`/`disconnect`/`connect_error`; everything
/// else arrives as a named frame to be decoded by [`ServerEvent::decode`].
#[derive(Debug, Clone)]
pub enum TransportEvent {
    Connected,
    Disconnected,
    ConnectError(String),
    Frame {
        event: String,
        payload: serde_json::Value,
    },
}
