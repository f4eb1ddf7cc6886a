//! Seams between the crawl logic and the remote feed.

use crate::model::{CommentThread, Post, Profile};
use anyhow::Result;

/// Lazy, fallible, newest-first stream of posts.
pub type PostStream<'a> = Box<dyn Iterator<Item = Result<Post>> + 'a>;

/// Lazy stream of one post's top-level comments; each item costs its own round-trips.
pub type ThreadStream<'a> = Box<dyn Iterator<Item = Result<CommentThread>> + 'a>;

/// Read access to one profile's feed.
pub trait FeedSource {
    fn profile(&self, username: &str) -> Result<Profile>;

    /// Posts of `profile`, newest first. Pages are fetched on demand.
    fn posts<'a>(&'a self, profile: &Profile) -> Result<PostStream<'a>>;

    /// Top-level comments of `post`, each with its replies, fetched as the stream is pulled.
    fn comments<'a>(&'a self, post: &Post) -> Result<ThreadStream<'a>>;
}
