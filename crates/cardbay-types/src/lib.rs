//! CardBay shared types.
//!
//! Wire/data model shared between the realtime sync engine and whatever
//! transport or REST layer feeds it: entity structs, the closed union of
//! server-pushed events, and the outbound command union.

pub mod events;
pub mod models;

pub use events::{ClientCommand, ServerEvent, TransportEvent};
pub use models::{
    Attachment, ChatMessage, ConversationSummary, Notification, NotificationKind, SenderType,
    TypingState, UnreadCounts,
};
