//! CardBay realtime sync engine.
//!
//! Client-resident reconciliation between server-pushed events and the
//! already-materialized local caches the UI renders from: unread counters,
//! notification lists, per-conversation message histories, typing presence,
//! and the admin inbox. One logical subscriber per session, several named
//! caches kept mutually consistent without a full reload.
//!
//! Layering, leaves first:
//! - `cache`: the keyed cache store and its pure transitions (no I/O)
//! - `effects`: user-facing side effects computed by the engine, and the
//!   sink that fires them
//! - `engine`: session/view state plus the event dispatcher that routes each
//!   decoded event to exactly one pipeline
//! - `transport`: the injectable connection seam (plus an in-memory fake)
//! - `gateway`: connection lifecycle gated by authentication

pub mod cache;
pub mod effects;
pub mod engine;
pub mod gateway;
pub mod transport;

pub use cache::{AdminInbox, CacheStore, NotificationFilter, PagedList};
pub use effects::{AlertError, Effect, EffectSink, NullSink, run_effects};
pub use engine::{Session, SyncEngine, ViewState};
pub use gateway::{AuthSession, Gateway, GatewayConfig};
pub use transport::{FakeTransport, Transport, TransportError};
