use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Notification categories as sent by the server. The chat/non-chat split
/// drives which filtered list a notification lands in and which unread
/// bucket it counts toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    OrderUpdate,
    SaleCompleted,
    Withdrawal,
    WalletCredit,
    OrderChat,
    System,
    /// Forward compatibility: unknown kinds are kept, treated as non-chat.
    #[serde(other)]
    Other,
}

impl NotificationKind {
    pub fn is_chat(&self) -> bool {
        matches!(self, Self::OrderChat)
    }
}

/// A user-facing notification. Immutable once created except `is_read`.
/// Identity is `id`; no cached list may hold the same id twice.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Server-computed unread scalars. The server upholds
/// `general + chat == total`; the client only ever replaces these wholesale,
/// never increments them (cached lists may be partial, so counting locally
/// would desync after any missed event).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreadCounts {
    pub total: u64,
    pub general: u64,
    pub chat: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderType {
    Customer,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub url: String,
    pub content_type: String,
}

/// One chat message. Belongs to exactly one conversation (`order_id`);
/// ordering within a conversation is append order as observed by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: Uuid,
    pub order_id: Uuid,
    pub sender_id: Uuid,
    pub sender_type: SenderType,
    pub body: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    pub created_at: DateTime<Utc>,
}

/// Ephemeral "who is typing" state for one conversation. Last write wins;
/// not persisted anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingState {
    pub user_id: Uuid,
    pub is_typing: bool,
    pub sender_type: SenderType,
}

/// Admin inbox entry summarizing one conversation by its latest activity.
/// Identity is `order_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub order_id: Uuid,
    pub customer_name: String,
    pub last_message: String,
    #[serde(default)]
    pub unread: u32,
    pub updated_at: DateTime<Utc>,
}
