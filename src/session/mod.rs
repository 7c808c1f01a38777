//! Session State
//!
//! The signed-in user's token, email, theme and preferences, plus the last
//! detection result. State lives in a [`SessionContext`] that callers pass
//! explicitly; it is loaded once from the [`LocalStore`] and written back on
//! every change.

mod context;
mod store;

pub use context::{Preferences, Session, SessionContext, Theme};
pub use store::{keys, LocalStore, StoreError, StoreResult};
