//! Progress reporting: count-style `indicatif` bars and the crawl's ETA heuristic.

use crate::date::days_between;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::{Duration, Instant};
use time::Date;

const TICK: Duration = Duration::from_millis(100);

fn count_style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
}

/// Count-style progress bar (items processed out of total), with an optional label.
/// Hidden when `visible` is false.
pub fn make_count_progress(total: u64, label: &str, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(total);
    pb.set_style(count_style(
        "{spinner:.green} {msg} {pos}/{len} [{bar:.cyan/blue}] {percent:>3}%  \
         elapsed: {elapsed_precise}",
    ));
    if !label.is_empty() {
        pb.set_message(label.to_string());
    }
    pb.enable_steady_tick(TICK);
    pb
}

/// `{h}h {m}m {s}s`; hours are not wrapped into days.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    let (hours, rem) = (secs / 3600, secs % 3600);
    format!("{}h {}m {}s", hours, rem / 60, rem % 60)
}

/// Posts still expected: bounded by the remaining post budget and by how many days
/// separate the current post from the window start at `posts_per_day`.
pub fn estimate_posts_remaining(
    max_posts: u64,
    examined: u64,
    current: Date,
    start: Date,
    posts_per_day: u32,
) -> u64 {
    let budget = max_posts.saturating_sub(examined);
    let days = days_between(current, start).max(0) as u64;
    budget.min(days.saturating_mul(posts_per_day as u64))
}

/// Average time per examined post times the posts still expected; `None` when nothing is left
/// or nothing has been examined yet.
pub fn estimate_time_remaining(elapsed: Duration, examined: u64, posts_remaining: u64) -> Option<Duration> {
    if posts_remaining == 0 || examined == 0 {
        return None;
    }
    let avg = elapsed.as_secs_f64() / examined as f64;
    Some(Duration::from_secs((avg * posts_remaining as f64) as u64))
}

/// Crawl-side status: elapsed time, examined posts, posts that yielded rows, and ETA display.
pub struct ProgressReporter {
    pb: ProgressBar,
    started: Instant,
    max_posts: u64,
    start_date: Date,
    posts_per_day: u32,
    examined: u64,
    with_rows: u64,
    last_eta: Option<Duration>,
}

impl ProgressReporter {
    pub fn new(max_posts: u64, start_date: Date, posts_per_day: u32, visible: bool) -> Self {
        let pb = if visible {
            let pb = ProgressBar::new(max_posts);
            pb.set_style(count_style(
                "{spinner:.green} {prefix} {pos}/{len} [{bar:.cyan/blue}] {percent:>3}%  \
                 {msg}  elapsed: {elapsed_precise}",
            ));
            pb.enable_steady_tick(TICK);
            pb
        } else {
            ProgressBar::hidden()
        };
        pb.set_prefix("Scraping posts");
        Self {
            pb,
            started: Instant::now(),
            max_posts,
            start_date,
            posts_per_day,
            examined: 0,
            with_rows: 0,
            last_eta: None,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn examined(&self) -> u64 {
        self.examined
    }

    pub fn posts_with_rows(&self) -> u64 {
        self.with_rows
    }

    pub fn last_eta(&self) -> Option<Duration> {
        self.last_eta
    }

    pub fn set_examined(&mut self, examined: u64) {
        self.examined = examined;
        self.pb.set_position(examined);
    }

    /// A post produced rows: bump the counter and recompute the ETA.
    pub fn post_done(&mut self, post_date: Date) {
        self.record_post(post_date, self.started.elapsed());
    }

    fn record_post(&mut self, post_date: Date, elapsed: Duration) {
        self.with_rows += 1;
        self.pb.set_message(format!("Found: {} | Last: {}", self.with_rows, post_date));

        let remaining = estimate_posts_remaining(
            self.max_posts,
            self.examined,
            post_date,
            self.start_date,
            self.posts_per_day,
        );
        if let Some(eta) = estimate_time_remaining(elapsed, self.examined, remaining) {
            self.pb.set_prefix(format!("Scraping (ETA: {})", format_duration(eta)));
            self.last_eta = Some(eta);
        }
    }

    pub fn finish(&self) {
        self.pb.finish_and_clear();
    }
}
