//! The remote Articles API collaborator.
//!
//! - [`types`] - wire types (`FeedItem`, `Page`, `PageRequest`) and the fixed
//!   [`Category`] list
//! - [`client`] - the [`ArticlesApi`] seam and its reqwest implementation

mod client;
mod types;

pub use client::{ApiError, ArticlesApi, HttpArticlesApi};
pub use types::{Category, FeedItem, Page, PageRequest, UnknownCategory};
