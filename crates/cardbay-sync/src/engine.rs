//! Event dispatcher and pipelines.
//!
//! [`SyncEngine::handle`] routes each decoded [`ServerEvent`] to exactly one
//! pipeline, applies the pure cache transitions, and returns the side effects
//! to fire. Handlers never call each other; when one event touches several
//! caches (a notification updates counters and two lists) the composition
//! lives in that handler's body. Nothing in here does I/O and nothing
//! propagates an error across an event boundary: edge cases are swallowed as
//! no-ops, exactly like a dropped frame.

use tracing::debug;
use uuid::Uuid;

use cardbay_types::events::ServerEvent;
use cardbay_types::models::{
    ChatMessage, ConversationSummary, Notification, TypingState, UnreadCounts,
};

use crate::cache::{CacheStore, NotificationFilter};
use crate::effects::Effect;

/// The authenticated principal this engine syncs for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub user_id: Uuid,
    pub is_admin: bool,
}

/// What the user is currently looking at. Mutated only by local UI actions,
/// never by inbound events; alert suppression and `order_history` targeting
/// both key off it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewState {
    /// Conversation whose view is mounted, if any.
    pub open_order: Option<Uuid>,
    /// Whether the user is in the room view of that conversation (as opposed
    /// to, say, the order detail tab).
    pub in_room: bool,
}

impl ViewState {
    fn viewing_room(&self, order_id: Uuid) -> bool {
        self.in_room && self.open_order == Some(order_id)
    }
}

/// The client-resident synchronization engine: cache store plus the session
/// and view context that event handling consults.
#[derive(Debug, Default)]
pub struct SyncEngine {
    caches: CacheStore,
    session: Option<Session>,
    view: ViewState,
}

impl SyncEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn caches(&self) -> &CacheStore {
        &self.caches
    }

    /// Mutable cache access for the initial REST seed.
    pub fn caches_mut(&mut self) -> &mut CacheStore {
        &mut self.caches
    }

    pub fn session(&self) -> Option<Session> {
        self.session
    }

    pub fn set_session(&mut self, session: Session) {
        self.session = Some(session);
    }

    /// Auth loss: forget who we were and everything we cached for them.
    pub fn clear_session(&mut self) {
        self.session = None;
        self.view = ViewState::default();
        self.caches.clear();
    }

    pub fn view(&self) -> ViewState {
        self.view
    }

    // ---- local UI actions ----

    pub fn open_conversation(&mut self, order_id: Uuid) {
        self.view.open_order = Some(order_id);
    }

    pub fn enter_room(&mut self) {
        self.view.in_room = true;
    }

    pub fn leave_room(&mut self) {
        self.view.in_room = false;
    }

    /// Leaving a conversation clears its typing entry and the view pointer.
    /// The message cache stays for fast re-entry.
    pub fn leave_conversation(&mut self, order_id: Uuid) {
        self.caches.clear_typing(order_id);
        if self.view.open_order == Some(order_id) {
            self.view = ViewState::default();
        }
    }

    // ---- dispatch ----

    /// Handle one decoded event. Runs to completion before the next event is
    /// processed; the returned effects are fired afterwards by the caller.
    pub fn handle(&mut self, event: ServerEvent) -> Vec<Effect> {
        match event {
            ServerEvent::NewNotification {
                notification,
                counts,
            } => self.on_notification(notification, counts),
            ServerEvent::TypingUpdate {
                order_id,
                user_id,
                is_typing,
                sender_type,
            } => {
                self.caches.set_typing(
                    order_id,
                    TypingState {
                        user_id,
                        is_typing,
                        sender_type,
                    },
                );
                vec![]
            }
            ServerEvent::NewMessage { message } => self.on_new_message(message),
            ServerEvent::OrderHistory(messages) => self.on_order_history(messages),
            ServerEvent::MessageAppended(message) => {
                self.caches.update_message(message.order_id, &message);
                vec![]
            }
            ServerEvent::AdminChatUpdate { conversation } => self.on_inbox_update(conversation),
        }
    }

    /// Notification pipeline: overwrite the three unread scalars from the
    /// server's numbers, prepend into the unfiltered list and into exactly
    /// one of the two filtered lists, and ask for an alert plus a profile
    /// refresh.
    fn on_notification(&mut self, notification: Notification, counts: UnreadCounts) -> Vec<Effect> {
        self.caches.set_unread_counts(&counts);
        self.caches
            .prepend_notification(NotificationFilter::All, &notification);
        let filtered = if notification.kind.is_chat() {
            NotificationFilter::Chat
        } else {
            NotificationFilter::General
        };
        self.caches.prepend_notification(filtered, &notification);

        vec![
            Effect::NotificationAlert(notification),
            Effect::RefreshProfile,
        ]
    }

    /// Chat pipeline, append mode. A conversation that was never populated is
    /// a closed view: the whole event is a no-op, alert included.
    fn on_new_message(&mut self, message: ChatMessage) -> Vec<Effect> {
        if !self.caches.has_conversation(message.order_id) {
            debug!("message for unopened conversation {}, ignoring", message.order_id);
            return vec![];
        }

        let own = self
            .session
            .is_some_and(|s| s.user_id == message.sender_id);
        let watching = self.view.viewing_room(message.order_id);
        let alert = (!own && !watching).then(|| Effect::MessageAlert(message.clone()));

        self.caches.append_message(&message);
        alert.into_iter().collect()
    }

    /// Chat pipeline, replace mode. `order_history` carries no conversation
    /// key; it always targets the conversation the viewer has open, arriving
    /// right after a room (re)join.
    fn on_order_history(&mut self, messages: Vec<ChatMessage>) -> Vec<Effect> {
        match self.view.open_order {
            Some(order_id) => self.caches.replace_history(order_id, messages),
            None => debug!("order_history with no open conversation, ignoring"),
        }
        vec![]
    }

    /// Chat pipeline, inbox upsert mode. The ding is admin-only and
    /// suppressed while the admin is already looking at that room.
    fn on_inbox_update(&mut self, conversation: ConversationSummary) -> Vec<Effect> {
        let is_admin = self.session.is_some_and(|s| s.is_admin);
        let watching = self.view.viewing_room(conversation.order_id);
        let alert = (is_admin && !watching).then(|| Effect::InboxAlert(conversation.clone()));

        self.caches.upsert_inbox_conversation(conversation);
        alert.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardbay_types::models::{NotificationKind, SenderType};
    use chrono::Utc;

    fn session(is_admin: bool) -> Session {
        Session {
            user_id: Uuid::new_v4(),
            is_admin,
        }
    }

    fn notification(kind: NotificationKind) -> Notification {
        Notification {
            id: Uuid::new_v4(),
            kind,
            title: "title".into(),
            message: "body".into(),
            is_read: false,
            metadata: serde_json::Value::Null,
            created_at: Utc::now(),
        }
    }

    fn message_from(order_id: Uuid, sender_id: Uuid) -> ChatMessage {
        ChatMessage {
            id: Uuid::new_v4(),
            order_id,
            sender_id,
            sender_type: SenderType::Customer,
            body: "hello".into(),
            attachments: vec![],
            created_at: Utc::now(),
        }
    }

    fn summary(order_id: Uuid) -> ConversationSummary {
        ConversationSummary {
            order_id,
            customer_name: "customer".into(),
            last_message: "hi".into(),
            unread: 1,
            updated_at: Utc::now(),
        }
    }

    fn counts(total: u64, general: u64, chat: u64) -> UnreadCounts {
        UnreadCounts {
            total,
            general,
            chat,
        }
    }

    fn seed_all_lists(engine: &mut SyncEngine) {
        engine
            .caches_mut()
            .seed_notifications(NotificationFilter::All, vec![vec![]]);
        engine
            .caches_mut()
            .seed_notifications(NotificationFilter::General, vec![vec![]]);
        engine
            .caches_mut()
            .seed_notifications(NotificationFilter::Chat, vec![vec![]]);
    }

    #[test]
    fn notification_lands_in_exactly_one_filtered_list() {
        let mut engine = SyncEngine::new();
        engine.set_session(session(false));
        engine.caches_mut().seed_unread_counts(counts(0, 0, 0));
        seed_all_lists(&mut engine);

        let chat_note = notification(NotificationKind::OrderChat);
        engine.handle(ServerEvent::NewNotification {
            notification: chat_note.clone(),
            counts: counts(1, 0, 1),
        });

        let caches = engine.caches();
        assert_eq!(caches.notifications(NotificationFilter::All).unwrap().len(), 1);
        assert_eq!(caches.notifications(NotificationFilter::Chat).unwrap().len(), 1);
        assert!(caches.notifications(NotificationFilter::General).unwrap().is_empty());

        let general_note = notification(NotificationKind::Withdrawal);
        engine.handle(ServerEvent::NewNotification {
            notification: general_note,
            counts: counts(2, 1, 1),
        });

        let caches = engine.caches();
        assert_eq!(caches.notifications(NotificationFilter::All).unwrap().len(), 2);
        assert_eq!(caches.notifications(NotificationFilter::Chat).unwrap().len(), 1);
        assert_eq!(caches.notifications(NotificationFilter::General).unwrap().len(), 1);
    }

    #[test]
    fn counts_come_from_the_event_never_from_local_arithmetic() {
        let mut engine = SyncEngine::new();
        engine.set_session(session(false));
        engine.caches_mut().seed_unread_counts(counts(0, 0, 0));

        // The server says 9/4/5 even though this is the first event we see.
        engine.handle(ServerEvent::NewNotification {
            notification: notification(NotificationKind::System),
            counts: counts(9, 4, 5),
        });

        assert_eq!(engine.caches().unread_total(), Some(9));
        assert_eq!(engine.caches().unread_general(), Some(4));
        assert_eq!(engine.caches().unread_chat(), Some(5));
    }

    #[test]
    fn notification_requests_alert_and_profile_refresh() {
        let mut engine = SyncEngine::new();
        engine.set_session(session(false));

        let effects = engine.handle(ServerEvent::NewNotification {
            notification: notification(NotificationKind::SaleCompleted),
            counts: counts(1, 1, 0),
        });

        assert!(matches!(effects[0], Effect::NotificationAlert(_)));
        assert!(matches!(effects[1], Effect::RefreshProfile));
    }

    #[test]
    fn chat_notification_with_unseeded_lists_still_overwrites_counts() {
        // Scenario: empty caches except counters. The list prepends are
        // no-ops, the counters still take the server's numbers.
        let mut engine = SyncEngine::new();
        engine.set_session(session(false));
        engine.caches_mut().seed_unread_counts(counts(0, 0, 0));

        engine.handle(ServerEvent::NewNotification {
            notification: notification(NotificationKind::OrderChat),
            counts: counts(3, 1, 2),
        });

        assert!(engine.caches().notifications(NotificationFilter::All).is_none());
        assert!(engine.caches().notifications(NotificationFilter::Chat).is_none());
        assert_eq!(engine.caches().unread_total(), Some(3));
        assert_eq!(engine.caches().unread_chat(), Some(2));
    }

    #[test]
    fn message_alert_suppressed_for_own_messages() {
        let mut engine = SyncEngine::new();
        let me = session(false);
        engine.set_session(me);
        let order_id = Uuid::new_v4();
        engine.caches_mut().replace_history(order_id, vec![]);

        let effects = engine.handle(ServerEvent::NewMessage {
            message: message_from(order_id, me.user_id),
        });

        assert!(effects.is_empty());
        assert_eq!(engine.caches().conversation(order_id).unwrap().len(), 1);
    }

    #[test]
    fn message_alert_suppressed_while_viewing_that_room() {
        let mut engine = SyncEngine::new();
        engine.set_session(session(false));
        let order_id = Uuid::new_v4();
        engine.caches_mut().replace_history(order_id, vec![]);
        engine.open_conversation(order_id);
        engine.enter_room();

        let effects = engine.handle(ServerEvent::NewMessage {
            message: message_from(order_id, Uuid::new_v4()),
        });
        assert!(effects.is_empty());

        // Same conversation open but not in the room view: alert fires.
        engine.leave_room();
        let effects = engine.handle(ServerEvent::NewMessage {
            message: message_from(order_id, Uuid::new_v4()),
        });
        assert!(matches!(effects.as_slice(), [Effect::MessageAlert(_)]));
    }

    #[test]
    fn message_for_unopened_conversation_is_fully_ignored() {
        let mut engine = SyncEngine::new();
        engine.set_session(session(false));
        let order_id = Uuid::new_v4();

        let effects = engine.handle(ServerEvent::NewMessage {
            message: message_from(order_id, Uuid::new_v4()),
        });

        assert!(effects.is_empty());
        assert!(!engine.caches().has_conversation(order_id));
    }

    #[test]
    fn order_history_replaces_the_open_conversation() {
        let mut engine = SyncEngine::new();
        engine.set_session(session(false));
        let order_id = Uuid::new_v4();
        engine.open_conversation(order_id);

        let history = vec![
            message_from(order_id, Uuid::new_v4()),
            message_from(order_id, Uuid::new_v4()),
        ];
        engine.handle(ServerEvent::OrderHistory(history.clone()));

        let cached = engine.caches().conversation(order_id).unwrap();
        assert_eq!(cached.len(), 2);
        assert_eq!(cached[0].id, history[0].id);
    }

    #[test]
    fn order_history_with_no_open_conversation_is_noop() {
        let mut engine = SyncEngine::new();
        engine.set_session(session(false));

        let stray = message_from(Uuid::new_v4(), Uuid::new_v4());
        engine.handle(ServerEvent::OrderHistory(vec![stray.clone()]));
        assert!(!engine.caches().has_conversation(stray.order_id));
    }

    #[test]
    fn message_appended_edits_by_id() {
        let mut engine = SyncEngine::new();
        engine.set_session(session(false));
        let order_id = Uuid::new_v4();
        let first = message_from(order_id, Uuid::new_v4());
        let second = message_from(order_id, Uuid::new_v4());
        engine
            .caches_mut()
            .replace_history(order_id, vec![first.clone(), second.clone()]);

        let mut edited = second.clone();
        edited.body = "edited".into();
        engine.handle(ServerEvent::MessageAppended(edited));

        let list = engine.caches().conversation(order_id).unwrap();
        assert_eq!(list[0].id, first.id);
        assert_eq!(list[1].body, "edited");

        // Unknown id: list unchanged.
        engine.handle(ServerEvent::MessageAppended(message_from(
            order_id,
            Uuid::new_v4(),
        )));
        assert_eq!(engine.caches().conversation(order_id).unwrap().len(), 2);
    }

    #[test]
    fn inbox_ding_only_for_admins_outside_the_room() {
        let mut engine = SyncEngine::new();
        let order_id = Uuid::new_v4();

        // Customer session: never dings.
        engine.set_session(session(false));
        engine.caches_mut().seed_inbox(vec![], 0);
        let effects = engine.handle(ServerEvent::AdminChatUpdate {
            conversation: summary(order_id),
        });
        assert!(effects.is_empty());

        // Admin session, not viewing: dings.
        engine.clear_session();
        engine.set_session(session(true));
        engine.caches_mut().seed_inbox(vec![], 0);
        let effects = engine.handle(ServerEvent::AdminChatUpdate {
            conversation: summary(order_id),
        });
        assert!(matches!(effects.as_slice(), [Effect::InboxAlert(_)]));

        // Admin viewing that exact room: silent, but the upsert still runs.
        engine.open_conversation(order_id);
        engine.enter_room();
        let effects = engine.handle(ServerEvent::AdminChatUpdate {
            conversation: summary(order_id),
        });
        assert!(effects.is_empty());
        assert_eq!(engine.caches().inbox().unwrap().items.len(), 1);
    }

    #[test]
    fn typing_updates_are_last_write_wins_per_conversation() {
        let mut engine = SyncEngine::new();
        engine.set_session(session(false));
        let order_id = Uuid::new_v4();
        let admin = Uuid::new_v4();

        engine.handle(ServerEvent::TypingUpdate {
            order_id,
            user_id: Uuid::new_v4(),
            is_typing: true,
            sender_type: SenderType::Customer,
        });
        engine.handle(ServerEvent::TypingUpdate {
            order_id,
            user_id: admin,
            is_typing: true,
            sender_type: SenderType::Admin,
        });

        let typing = engine.caches().typing(order_id).unwrap();
        assert_eq!(typing.user_id, admin);
        assert_eq!(typing.sender_type, SenderType::Admin);
    }

    #[test]
    fn leaving_a_conversation_clears_typing_but_keeps_messages() {
        let mut engine = SyncEngine::new();
        engine.set_session(session(false));
        let order_id = Uuid::new_v4();
        engine.open_conversation(order_id);
        engine.enter_room();
        engine
            .caches_mut()
            .replace_history(order_id, vec![message_from(order_id, Uuid::new_v4())]);
        engine.handle(ServerEvent::TypingUpdate {
            order_id,
            user_id: Uuid::new_v4(),
            is_typing: true,
            sender_type: SenderType::Admin,
        });

        engine.leave_conversation(order_id);

        assert!(engine.caches().typing(order_id).is_none());
        assert!(engine.caches().has_conversation(order_id));
        assert_eq!(engine.view(), ViewState::default());
    }

    #[test]
    fn clearing_the_session_tears_down_every_cache() {
        let mut engine = SyncEngine::new();
        engine.set_session(session(true));
        engine.caches_mut().seed_unread_counts(counts(4, 2, 2));
        engine.caches_mut().seed_inbox(vec![summary(Uuid::new_v4())], 1);

        engine.clear_session();

        assert!(engine.session().is_none());
        assert_eq!(engine.caches().unread_total(), None);
        assert!(engine.caches().inbox().is_none());
    }
}
