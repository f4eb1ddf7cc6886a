#![allow(dead_code)]

use anyhow::{anyhow, Result};
use rekap::{Comment, CommentThread, DelayWindow, FeedSource, PageFetcher, Pacer, Post, PostStream, Profile, ThreadStream};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::Path;
use time::{Date, Month, OffsetDateTime, Time};

/// UTC timestamp at `hour`:00 on the given day.
pub fn at(y: i32, m: u8, d: u8, hour: u8) -> OffsetDateTime {
    let month = Month::try_from(m).unwrap();
    Date::from_calendar_date(y, month, d).unwrap().with_time(Time::from_hms(hour, 0, 0).unwrap()).assume_utc()
}

pub fn day(y: i32, m: u8, d: u8) -> Date {
    at(y, m, d, 0).date()
}

pub fn post(code: &str, (y, m, d): (i32, u8, u8), comments: u64) -> Post {
    Post {
        shortcode: code.to_string(),
        taken_at: at(y, m, d, 12),
        caption: Some(format!("caption of {code}\nsecond line")),
        likes: 7,
        comments,
    }
}

pub fn comment(owner: Option<&str>, text: &str) -> Comment {
    Comment { owner: owner.map(str::to_string), text: text.to_string(), likes: 1, created_at: at(2025, 7, 2, 8) }
}

pub fn thread(top: Comment, replies: Vec<Comment>) -> CommentThread {
    CommentThread { comment: top, replies }
}

/// In-memory feed: a fixed list of posts (newest first) with per-post comment results.
pub struct FakeFeed {
    pub profile: Option<Profile>,
    pub posts: Vec<Post>,
    pub threads: HashMap<String, Vec<CommentThread>>,
    /// Per post: fail when pulling the thread at this index, with this message.
    pub comment_errors: HashMap<String, (usize, String)>,
    /// Yield an error instead of the post at this index.
    pub fail_at: Option<usize>,
    pub pulled: Cell<usize>,
    pub comment_calls: RefCell<Vec<String>>,
    /// Every thread pulled, as `fetch {code}#{i}`, shared with `EventPacer`.
    pub events: RefCell<Vec<String>>,
}

impl FakeFeed {
    pub fn new(posts: Vec<Post>) -> Self {
        Self {
            profile: Some(Profile { id: "42".into(), username: "kominfo".into(), media_count: posts.len() as u64 }),
            posts,
            threads: HashMap::new(),
            comment_errors: HashMap::new(),
            events: RefCell::new(Vec::new()),
            fail_at: None,
            pulled: Cell::new(0),
            comment_calls: RefCell::new(Vec::new()),
        }
    }

    pub fn with_threads(mut self, code: &str, threads: Vec<CommentThread>) -> Self {
        self.threads.insert(code.to_string(), threads);
        self
    }

    /// The very first comment request of `code` fails.
    pub fn with_comment_failure(self, code: &str, msg: &str) -> Self {
        self.with_thread_failure(code, 0, msg)
    }

    /// Threads before `index` arrive, then the request for the next one fails.
    pub fn with_thread_failure(mut self, code: &str, index: usize, msg: &str) -> Self {
        self.comment_errors.insert(code.to_string(), (index, msg.to_string()));
        self
    }
}

impl FeedSource for FakeFeed {
    fn profile(&self, username: &str) -> Result<Profile> {
        self.profile.clone().ok_or_else(|| anyhow!("profile {username} does not exist"))
    }

    fn posts<'a>(&'a self, _profile: &Profile) -> Result<PostStream<'a>> {
        Ok(Box::new(self.posts.iter().enumerate().map(move |(i, p)| {
            self.pulled.set(self.pulled.get() + 1);
            if self.fail_at == Some(i) {
                return Err(anyhow!("timeline page: bad status"));
            }
            Ok(p.clone())
        })))
    }

    fn comments<'a>(&'a self, post: &Post) -> Result<ThreadStream<'a>> {
        let code = post.shortcode.clone();
        self.comment_calls.borrow_mut().push(code.clone());
        let threads = self.threads.get(&code).cloned().unwrap_or_default();
        let failure = self.comment_errors.get(&code).cloned();
        let len = failure.as_ref().map_or(threads.len(), |(at, _)| at + 1);
        let mut threads = threads.into_iter();
        Ok(Box::new((0..len).map(move |i| {
            self.events.borrow_mut().push(format!("fetch {code}#{i}"));
            match &failure {
                Some((at, msg)) if *at == i => Err(anyhow!("{}", msg)),
                _ => threads.next().ok_or_else(|| anyhow!("thread {i} of {code} missing")),
            }
        })))
    }
}

/// Serves canned HTML per URL; unknown URLs fail like a 404.
#[derive(Default)]
pub struct FakeFetcher {
    pub pages: HashMap<String, String>,
}

impl FakeFetcher {
    pub fn with_page(mut self, url: &str, html: String) -> Self {
        self.pages.insert(url.to_string(), html);
        self
    }
}

impl PageFetcher for FakeFetcher {
    fn fetch(&self, url: &str) -> Result<String> {
        self.pages.get(url).cloned().ok_or_else(|| anyhow!("GET {url}: 404 Not Found"))
    }
}

/// A "data real-time" page: header row then one `<tr>` per (date, time, title, unit, qty).
pub fn data_page(rows: &[(&str, &str, &str, &str, &str)]) -> String {
    let mut html = String::from(
        "<html><body><h1>Data Real Time</h1><table class=\"table\">\
         <tr><th>Tanggal</th><th>Waktu</th><th>Judul</th><th>Satuan</th><th>Jumlah</th></tr>",
    );
    for (d, t, j, s, q) in rows {
        html.push_str(&format!("<tr><td>{d}</td><td>{t}</td><td>{j}</td><td>{s}</td><td>{q}</td></tr>"));
    }
    html.push_str("</table></body></html>");
    html
}

/// Every CSV record of `path`, header included.
pub fn read_csv(path: &Path) -> Vec<Vec<String>> {
    let mut r = csv::ReaderBuilder::new().has_headers(false).from_path(path).unwrap();
    r.records().map(|rec| rec.unwrap().iter().map(str::to_string).collect()).collect()
}

/// Pacer that writes into the feed's event list, so fetches and pauses share one timeline.
pub struct EventPacer<'a>(pub &'a RefCell<Vec<String>>);

impl Pacer for EventPacer<'_> {
    fn pause(&self, w: DelayWindow) {
        self.0.borrow_mut().push(format!("pause {}-{}", w.min_secs, w.max_secs));
    }
}
