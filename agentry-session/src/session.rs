use crate::{Events, State};
use chrono::{DateTime, Utc};

pub trait Session: Send + Sync {
    fn id(&self) -> &str;
    fn app_name(&self) -> &str;
    fn user_id(&self) -> &str;
    fn state(&self) -> &dyn State;
    fn events(&self) -> &dyn Events;
    fn last_update_time(&self) -> DateTime<Utc>;
}

impl std::fmt::Debug for dyn Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id())
            .field("app_name", &self.app_name())
            .field("user_id", &self.user_id())
            .finish_non_exhaustive()
    }
}

pub use agentry_core::{KEY_PREFIX_APP, KEY_PREFIX_TEMP, KEY_PREFIX_USER};
