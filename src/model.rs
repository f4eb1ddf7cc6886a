//! Records flowing through both pipelines.

use crate::date::{iso8601, YearMonth};
use serde::Serialize;
use time::{Date, OffsetDateTime};

/// Placeholder username for comments whose owner is no longer available.
pub const DELETED_OWNER: &str = "[deleted]";

/// Profile summary returned by the feed source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Profile {
    pub id: String,
    pub username: String,
    pub media_count: u64,
}

/// One post in the remote feed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Post {
    pub shortcode: String,
    pub taken_at: OffsetDateTime,
    pub caption: Option<String>,
    pub likes: u64,
    pub comments: u64,
}

impl Post {
    /// Calendar day (UTC) the post was published.
    pub fn date(&self) -> Date {
        self.taken_at.date()
    }

    pub fn url(&self) -> String {
        format!("https://instagram.com/p/{}", self.shortcode)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Comment {
    pub owner: Option<String>,
    pub text: String,
    pub likes: u64,
    pub created_at: OffsetDateTime,
}

impl Comment {
    pub fn owner_or_deleted(&self) -> &str {
        self.owner.as_deref().unwrap_or(DELETED_OWNER)
    }
}

/// A top-level comment with its nested replies.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommentThread {
    pub comment: Comment,
    pub replies: Vec<Comment>,
}

/// Flattened comment, ready to be joined with its post.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommentRecord {
    pub username: String,
    pub text: String,
    pub likes: u64,
    pub timestamp: OffsetDateTime,
    pub is_reply: bool,
    pub reply_to: Option<String>,
}

/// Header of the crawl output, in column order.
pub const OUTPUT_HEADER: [&str; 11] = [
    "post_url",
    "date",
    "caption",
    "likes",
    "comments_count",
    "comment_username",
    "comment_text",
    "comment_likes",
    "comment_timestamp",
    "is_reply",
    "reply_to",
];

/// One CSV row of the crawl output: post fields duplicated on every comment row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OutputRow {
    pub post_url: String,
    pub date: String,
    pub caption: String,
    pub likes: u64,
    pub comments_count: u64,
    pub comment_username: String,
    pub comment_text: String,
    pub comment_likes: u64,
    pub comment_timestamp: String,
    pub is_reply: bool,
    pub reply_to: String,
}

impl OutputRow {
    pub fn new(post: &Post, c: &CommentRecord) -> Self {
        Self {
            post_url: post.url(),
            date: iso8601(post.taken_at),
            caption: post.caption.as_deref().map(flatten_text).unwrap_or_default(),
            likes: post.likes,
            comments_count: post.comments,
            comment_username: c.username.clone(),
            comment_text: c.text.clone(),
            comment_likes: c.likes,
            comment_timestamp: iso8601(c.timestamp),
            is_reply: c.is_reply,
            reply_to: c.reply_to.clone().unwrap_or_default(),
        }
    }
}

/// Single-line rendering of free text: newlines become spaces, ends trimmed.
pub fn flatten_text(s: &str) -> String {
    s.replace(['\r', '\n'], " ").trim().to_string()
}

/// One observation from a municipal data table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScrapedRow {
    pub opd: String,
    pub date: Date,
    pub time: String,
    pub title: String,
    pub unit: String,
    pub quantity: i64,
}

impl ScrapedRow {
    pub fn key(&self) -> AggregateKey {
        AggregateKey {
            opd: self.opd.clone(),
            bulan: YearMonth::of(self.date),
            judul: self.title.clone(),
            satuan: self.unit.clone(),
        }
    }
}

/// Recap bucket: (source, month, title, unit).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AggregateKey {
    pub opd: String,
    pub bulan: YearMonth,
    pub judul: String,
    pub satuan: String,
}

/// Header of the recap output, in column order.
pub const RECAP_HEADER: [&str; 5] = ["opd", "bulan", "judul", "satuan", "jumlah"];
