//! Live Monitoring
//!
//! Two ways of watching traffic:
//! - a timed server-side run (`POST /monitor/start`) configured by [`MonitorParams`]
//! - a client-side [`StreamPoller`] that pulls one packet per interval into a
//!   bounded newest-first [`Feed`]

pub mod feed;
pub mod params;
pub mod poller;
pub mod source;

pub use feed::{Feed, FeedEntry, DEFAULT_FEED_CAPACITY};
pub use params::{MonitorParams, ALERTS_DISABLED_THRESHOLD};
pub use poller::{PollerState, StreamEvent, StreamPoller};
pub use source::{PacketSource, TokenStream};
