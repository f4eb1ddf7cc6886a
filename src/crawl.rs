//! Pipeline A: bounded crawl of one profile into a flat CSV of (post, comment) rows.

use crate::comments::CommentCollector;
use crate::config::{CrawlOptions, Credentials};
use crate::date::DateWindow;
use crate::instagram::InstagramClient;
use crate::logsink::LogSink;
use crate::model::{OutputRow, Post, OUTPUT_HEADER};
use crate::pacing::{Pacer, PacingPolicy, SleepPacer};
use crate::progress::{format_duration, ProgressReporter};
use crate::session::{authenticate, FileSessionStore, SessionStore};
use crate::sink::RecordSink;
use crate::source::FeedSource;
use crate::util::init_tracing_once;
use crate::walker::{FeedWalker, StopReason};
use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// What a finished (or aborted-after-start) crawl did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CrawlSummary {
    pub examined: u64,
    pub posts_with_rows: u64,
    pub rows_written: u64,
    pub stop_reason: Option<StopReason>,
    pub elapsed: Duration,
    pub output: PathBuf,
}

#[derive(Clone, Default)]
pub struct SocialCrawl {
    pub(crate) opts: CrawlOptions,
}

impl SocialCrawl {
    pub fn new() -> Self {
        Self { opts: CrawlOptions::default() }
    }

    pub fn with_options(opts: CrawlOptions) -> Self {
        Self { opts }
    }

    pub fn options(&self) -> &CrawlOptions {
        &self.opts
    }

    // -------- Builder methods --------
    pub fn profile(mut self, p: impl AsRef<str>) -> Self { self.opts = self.opts.with_profile(p); self }
    pub fn window(mut self, w: DateWindow) -> Self { self.opts = self.opts.with_window(w); self }
    pub fn max_posts(mut self, n: u64) -> Self { self.opts = self.opts.with_max_posts(n); self }
    pub fn posts_per_day(mut self, n: u32) -> Self { self.opts = self.opts.with_posts_per_day(n); self }
    pub fn output(mut self, path: impl AsRef<Path>) -> Self { self.opts = self.opts.with_output(path); self }
    pub fn session_dir(mut self, dir: impl AsRef<Path>) -> Self { self.opts = self.opts.with_session_dir(dir); self }
    pub fn pacing(mut self, pacing: PacingPolicy) -> Self { self.opts = self.opts.with_pacing(pacing); self }
    pub fn progress(mut self, yes: bool) -> Self { self.opts = self.opts.with_progress(yes); self }

    /// Authenticate against Instagram (reusing the cached session when present) and crawl.
    pub fn run_instagram<L: LogSink + ?Sized>(&self, creds: &Credentials, log: &L) -> Result<CrawlSummary> {
        let store = FileSessionStore::new(&self.opts.session_dir);
        self.run_instagram_with(creds, &store, log)
    }

    pub fn run_instagram_with<S, L>(&self, creds: &Credentials, store: &S, log: &L) -> Result<CrawlSummary>
    where
        S: SessionStore + ?Sized,
        L: LogSink + ?Sized,
    {
        init_tracing_once();
        let mut client = InstagramClient::new(&self.opts.user_agent, self.opts.request_timeout)?;
        if let Err(e) = authenticate(&mut client, creds, store, log) {
            log.emit(&format!("Authentication failed: {:#}", e));
            return Err(e.context("authentication failed"));
        }
        self.run(&client, &SleepPacer, log)
    }

    /// Crawl `source` into the configured output file.
    pub fn run<S, P, L>(&self, source: &S, pacer: &P, log: &L) -> Result<CrawlSummary>
    where
        S: FeedSource + ?Sized,
        P: Pacer + ?Sized,
        L: LogSink + ?Sized,
    {
        let o = &self.opts;
        log.emit(&"=".repeat(50));
        log.emit(&format!("Starting scrape of @{} from {} to {}", o.profile, o.window.start, o.window.end));
        log.emit(&"=".repeat(50));

        let mut sink = match RecordSink::create(&o.output, &OUTPUT_HEADER) {
            Ok(s) => s,
            Err(e) => {
                log.emit(&format!("Failed to create CSV file: {:#}", e));
                return Err(e);
            }
        };

        let mut reporter = ProgressReporter::new(o.max_posts, o.window.start, o.posts_per_day, o.progress);
        let walked = self.walk(source, pacer, log, &mut sink, &mut reporter);
        reporter.finish();

        let rows_written = sink.rows();
        let closed = sink.finish().map(drop).with_context(|| format!("close {}", o.output.display()));

        let elapsed = reporter.elapsed();
        log.emit(&format!("Finished in {}", format_duration(elapsed)));
        log.emit(&format!("- Processed {} posts", reporter.examined()));
        log.emit(&format!("- Found {} posts with comments", reporter.posts_with_rows()));
        log.emit(&format!("- Data saved to {}", o.output.display()));

        let stop_reason = walked?;
        closed?;
        Ok(CrawlSummary {
            examined: reporter.examined(),
            posts_with_rows: reporter.posts_with_rows(),
            rows_written,
            stop_reason,
            elapsed,
            output: o.output.clone(),
        })
    }

    fn walk<S, P, L, W>(
        &self,
        source: &S,
        pacer: &P,
        log: &L,
        sink: &mut RecordSink<W>,
        reporter: &mut ProgressReporter,
    ) -> Result<Option<StopReason>>
    where
        S: FeedSource + ?Sized,
        P: Pacer + ?Sized,
        L: LogSink + ?Sized,
        W: Write,
    {
        let o = &self.opts;
        let profile = match source.profile(&o.profile) {
            Ok(p) => p,
            Err(e) => {
                log.emit(&format!("Failed to load profile: {:#}", e));
                return Err(e.context(format!("load profile @{}", o.profile)));
            }
        };
        log.emit(&format!("Found profile @{} with {} posts", profile.username, profile.media_count));

        let feed = match source.posts(&profile) {
            Ok(f) => f,
            Err(e) => {
                log.emit(&format!("Failed to load posts of @{}: {:#}", profile.username, e));
                return Err(e);
            }
        };

        let collector = CommentCollector::new(source, pacer, log, o.pacing.per_comment);
        let mut walker = FeedWalker::new(feed, o.window, o.max_posts);

        while let Some(next) = walker.next() {
            reporter.set_examined(walker.examined());
            let post = match next {
                Ok(p) => p,
                Err(e) => {
                    log.emit(&format!("Feed failed after {} posts: {:#}", walker.examined(), e));
                    return Err(e.context("walk feed"));
                }
            };

            match write_post(&collector, sink, &post) {
                Ok(0) => {}
                Ok(_) => {
                    reporter.post_done(post.date());
                    pacer.pause(o.pacing.per_post);
                }
                Err(e) => {
                    log.emit(&format!("Failed to scrape post {}: {:#}", post.shortcode, e));
                    pacer.pause(o.pacing.cooldown);
                }
            }
        }
        reporter.set_examined(walker.examined());

        match walker.stop_reason() {
            Some(StopReason::ReachedStartDate) => log.emit(&format!("Reached start date {}", o.window.start)),
            Some(StopReason::ReachedPostLimit) => log.emit(&format!("Reached post limit {}", o.max_posts)),
            _ => {}
        }
        Ok(walker.stop_reason())
    }
}

/// Rows for one post; returns how many were written. A comment failure writes nothing.
fn write_post<S, P, L, W>(collector: &CommentCollector<'_, S, P, L>, sink: &mut RecordSink<W>, post: &Post) -> Result<u64>
where
    S: FeedSource + ?Sized,
    P: Pacer + ?Sized,
    L: LogSink + ?Sized,
    W: Write,
{
    let records = collector.collect(post)?;
    if records.is_empty() {
        return Ok(0);
    }
    for r in &records {
        sink.write(&OutputRow::new(post, r))?;
    }
    sink.flush()?;
    Ok(records.len() as u64)
}
