use crate::logsink::LogSink;
use crate::model::{flatten_text, Comment, CommentRecord, CommentThread, Post};
use crate::pacing::{DelayWindow, Pacer};
use crate::source::FeedSource;
use anyhow::{Context, Result};

fn record(c: &Comment, reply_to: Option<&str>) -> CommentRecord {
    CommentRecord {
        username: c.owner_or_deleted().to_string(),
        text: flatten_text(&c.text),
        likes: c.likes,
        timestamp: c.created_at,
        is_reply: reply_to.is_some(),
        reply_to: reply_to.map(str::to_string),
    }
}

/// The top-level comment, then its replies pointing back at the parent owner.
pub fn flatten_thread(t: &CommentThread) -> Vec<CommentRecord> {
    let parent = t.comment.owner_or_deleted();
    let mut out = Vec::with_capacity(1 + t.replies.len());
    out.push(record(&t.comment, None));
    out.extend(t.replies.iter().map(|reply| record(reply, Some(parent))));
    out
}

/// Pulls one post's comment threads and flattens them, pausing after each thread.
pub struct CommentCollector<'a, S: ?Sized, P: ?Sized, L: ?Sized> {
    source: &'a S,
    pacer: &'a P,
    log: &'a L,
    per_comment: DelayWindow,
}

impl<'a, S, P, L> CommentCollector<'a, S, P, L>
where
    S: FeedSource + ?Sized,
    P: Pacer + ?Sized,
    L: LogSink + ?Sized,
{
    pub fn new(source: &'a S, pacer: &'a P, log: &'a L, per_comment: DelayWindow) -> Self {
        Self { source, pacer, log, per_comment }
    }

    /// Records for `post`, empty when it has no comments.
    /// Any failure while pulling threads drops the whole post.
    pub fn collect(&self, post: &Post) -> Result<Vec<CommentRecord>> {
        if post.comments == 0 {
            return Ok(Vec::new());
        }
        let ctx = || format!("scrape comments for post {}", post.shortcode);
        let mut out = Vec::new();
        for thread in self.source.comments(post).with_context(ctx)? {
            let thread = thread.with_context(ctx)?;
            out.extend(flatten_thread(&thread));
            self.pacer.pause(self.per_comment);
        }
        if out.is_empty() {
            self.log.emit(&format!("Post {} reports {} comments but none were returned", post.shortcode, post.comments));
        }
        Ok(out)
    }
}
