//! # agentry-session
//!
//! Session management for Agentry agents: the [`SessionService`] trait and an
//! in-memory implementation. A session is addressed by
//! `(app_name, user_id, session_id)` and carries an event log plus a state
//! map with `app:`/`user:`/`temp:` scope prefixes.

pub mod event;
pub mod inmemory;
pub mod service;
pub mod session;
pub mod state;

pub use event::{Event, EventActions, Events};
pub use inmemory::InMemorySessionService;
pub use service::{CreateRequest, DeleteRequest, GetRequest, ListRequest, SessionService};
pub use session::{KEY_PREFIX_APP, KEY_PREFIX_TEMP, KEY_PREFIX_USER, Session};
pub use state::State;
