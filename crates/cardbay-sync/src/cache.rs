//! Keyed cache store and its pure transitions.
//!
//! Every partition starts absent and is seeded by the initial REST fetch (the
//! `seed_*` setters model that collaborator). The transitions below only ever
//! mutate caches that already exist: an event targeting an unseeded cache is
//! a no-op, and the eventual fetch stays authoritative for first paint. The
//! one exception is `replace_history`, which installs the server's canonical
//! message list for a conversation and is the only way a conversation cache
//! comes into being.

use std::collections::HashMap;

use uuid::Uuid;

use cardbay_types::models::{ChatMessage, ConversationSummary, Notification, TypingState, UnreadCounts};

/// Which notification list a transition targets. The server partitions
/// notifications into chat and non-chat; `All` is the unfiltered view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationFilter {
    All,
    General,
    Chat,
}

/// An infinite-scroll notification list as fetched page by page. Realtime
/// arrivals only ever land in page 0; later pages stay exactly as fetched.
#[derive(Debug, Clone, Default)]
pub struct PagedList {
    pub pages: Vec<Vec<Notification>>,
}

impl PagedList {
    fn prepend(&mut self, notification: Notification) {
        // A list with no pages is as unpopulated as an absent one: nothing to
        // prepend into, and the real fetch will install page 0.
        if let Some(first) = self.pages.first_mut() {
            first.insert(0, notification);
        }
    }

    /// All cached items in display order.
    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.pages.iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.pages.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Admin-side aggregated conversation list, most recently active first.
/// `total` counts all conversations on the server, not just the cached page.
#[derive(Debug, Clone, Default)]
pub struct AdminInbox {
    pub items: Vec<ConversationSummary>,
    pub total: u64,
}

/// The caches this subsystem writes to and the rendering layer reads from.
#[derive(Debug, Default)]
pub struct CacheStore {
    unread_total: Option<u64>,
    unread_general: Option<u64>,
    unread_chat: Option<u64>,

    notifications_all: Option<PagedList>,
    notifications_general: Option<PagedList>,
    notifications_chat: Option<PagedList>,

    conversations: HashMap<Uuid, Vec<ChatMessage>>,
    inbox: Option<AdminInbox>,
    typing: HashMap<Uuid, TypingState>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- seeding (initial REST fetch) ----

    pub fn seed_unread_counts(&mut self, counts: UnreadCounts) {
        self.unread_total = Some(counts.total);
        self.unread_general = Some(counts.general);
        self.unread_chat = Some(counts.chat);
    }

    pub fn seed_notifications(&mut self, filter: NotificationFilter, pages: Vec<Vec<Notification>>) {
        *self.list_slot(filter) = Some(PagedList { pages });
    }

    pub fn seed_inbox(&mut self, items: Vec<ConversationSummary>, total: u64) {
        self.inbox = Some(AdminInbox { items, total });
    }

    // ---- transitions ----

    /// Overwrite the unread scalars from the server's numbers. Replacement
    /// only, never an increment, and only for scalars that have been seeded.
    pub fn set_unread_counts(&mut self, counts: &UnreadCounts) {
        if let Some(total) = self.unread_total.as_mut() {
            *total = counts.total;
        }
        if let Some(general) = self.unread_general.as_mut() {
            *general = counts.general;
        }
        if let Some(chat) = self.unread_chat.as_mut() {
            *chat = counts.chat;
        }
    }

    /// Push a notification onto the front of one list's first page. No-op if
    /// that list has never been fetched — a fake first page would be
    /// invalidated by the real fetch anyway.
    pub fn prepend_notification(&mut self, filter: NotificationFilter, notification: &Notification) {
        if let Some(list) = self.list_slot(filter).as_mut() {
            list.prepend(notification.clone());
        }
    }

    /// Append a message to its conversation's cached list. Returns whether
    /// the list changed: absent caches are never created here, and an id
    /// already present is skipped (at-least-once delivery, and the
    /// optimistic-then-confirmed race, both land on this dedup).
    pub fn append_message(&mut self, message: &ChatMessage) -> bool {
        let Some(list) = self.conversations.get_mut(&message.order_id) else {
            return false;
        };
        if list.iter().any(|m| m.id == message.id) {
            return false;
        }
        list.push(message.clone());
        true
    }

    /// Install the server's canonical history for a conversation, replacing
    /// whatever was cached. This is the only transition that creates a
    /// conversation cache.
    pub fn replace_history(&mut self, order_id: Uuid, messages: Vec<ChatMessage>) {
        self.conversations.insert(order_id, messages);
    }

    /// Replace a single cached message by id. Returns whether a message was
    /// replaced; an unknown id or an absent cache leaves everything as is.
    pub fn update_message(&mut self, order_id: Uuid, message: &ChatMessage) -> bool {
        let Some(list) = self.conversations.get_mut(&order_id) else {
            return false;
        };
        match list.iter_mut().find(|m| m.id == message.id) {
            Some(slot) => {
                *slot = message.clone();
                true
            }
            None => false,
        }
    }

    /// Move a conversation summary to the front of the admin inbox, replacing
    /// any previous entry with the same `order_id`. The total conversation
    /// count grows only when the entry is genuinely new.
    pub fn upsert_inbox_conversation(&mut self, conversation: ConversationSummary) {
        let Some(inbox) = self.inbox.as_mut() else {
            return;
        };
        let previous = inbox
            .items
            .iter()
            .position(|c| c.order_id == conversation.order_id);
        if let Some(index) = previous {
            inbox.items.remove(index);
        } else {
            inbox.total += 1;
        }
        inbox.items.insert(0, conversation);
    }

    /// Last-write-wins typing entry for a conversation.
    pub fn set_typing(&mut self, order_id: Uuid, state: TypingState) {
        self.typing.insert(order_id, state);
    }

    /// Forget the typing entry for a conversation (viewer left it).
    pub fn clear_typing(&mut self, order_id: Uuid) {
        self.typing.remove(&order_id);
    }

    /// Drop one conversation's message list (owning view unmounted).
    pub fn drop_conversation(&mut self, order_id: Uuid) {
        self.conversations.remove(&order_id);
    }

    /// Full teardown on auth loss.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    // ---- reads ----

    pub fn unread_total(&self) -> Option<u64> {
        self.unread_total
    }

    pub fn unread_general(&self) -> Option<u64> {
        self.unread_general
    }

    pub fn unread_chat(&self) -> Option<u64> {
        self.unread_chat
    }

    pub fn notifications(&self, filter: NotificationFilter) -> Option<&PagedList> {
        match filter {
            NotificationFilter::All => self.notifications_all.as_ref(),
            NotificationFilter::General => self.notifications_general.as_ref(),
            NotificationFilter::Chat => self.notifications_chat.as_ref(),
        }
    }

    pub fn conversation(&self, order_id: Uuid) -> Option<&[ChatMessage]> {
        self.conversations.get(&order_id).map(Vec::as_slice)
    }

    pub fn has_conversation(&self, order_id: Uuid) -> bool {
        self.conversations.contains_key(&order_id)
    }

    pub fn inbox(&self) -> Option<&AdminInbox> {
        self.inbox.as_ref()
    }

    pub fn typing(&self, order_id: Uuid) -> Option<&TypingState> {
        self.typing.get(&order_id)
    }

    fn list_slot(&mut self, filter: NotificationFilter) -> &mut Option<PagedList> {
        match filter {
            NotificationFilter::All => &mut self.notifications_all,
            NotificationFilter::General => &mut self.notifications_general,
            NotificationFilter::Chat => &mut self.notifications_chat,
        }
    }
}
