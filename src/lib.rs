//! Resumable, paginated article feed client.
//!
//! [`feed::FeedController`] pages through the Articles API and discards
//! superseded responses, [`visibility::VisibilityTracker`] picks the item
//! occupying most of the viewport, and [`session::SessionStore`] snapshots
//! the feed so it can be resumed. [`reader::ReaderSession`] wires the three
//! together.

pub mod api;
pub mod config;
pub mod feed;
pub mod reader;
pub mod session;
pub mod storage;
pub mod util;
pub mod visibility;
