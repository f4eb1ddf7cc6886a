//! Bounded walk over a newest-first feed.
//!
//! Stop conditions are checked per post, in this order:
//! 1. post older than the window start: the walk ends (everything after is older still);
//! 2. post newer than the window end: skipped;
//! 3. `max_posts` already examined: the walk ends without pulling another post;
//! 4. post without comments: skipped.

use crate::date::DateWindow;
use crate::model::Post;
use anyhow::Result;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    ReachedStartDate,
    ReachedPostLimit,
    FeedExhausted,
    FeedError,
}

pub struct FeedWalker<I> {
    feed: I,
    window: DateWindow,
    max_posts: u64,
    examined: u64,
    stopped: Option<StopReason>,
}

impl<I> FeedWalker<I>
where
    I: Iterator<Item = Result<Post>>,
{
    pub fn new(feed: I, window: DateWindow, max_posts: u64) -> Self {
        Self { feed, window, max_posts, examined: 0, stopped: None }
    }

    /// Posts pulled from the feed so far, skipped ones included.
    pub fn examined(&self) -> u64 {
        self.examined
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stopped
    }

    fn stop(&mut self, why: StopReason) {
        self.stopped = Some(why);
    }
}

impl<I> Iterator for FeedWalker<I>
where
    I: Iterator<Item = Result<Post>>,
{
    type Item = Result<Post>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.stopped.is_some() {
            return None;
        }
        loop {
            if self.examined >= self.max_posts {
                self.stop(StopReason::ReachedPostLimit);
                return None;
            }
            let post = match self.feed.next() {
                None => {
                    self.stop(StopReason::FeedExhausted);
                    return None;
                }
                Some(Err(e)) => {
                    self.stop(StopReason::FeedError);
                    return Some(Err(e));
                }
                Some(Ok(p)) => p,
            };
            self.examined += 1;

            let day = post.date();
            if day < self.window.start {
                self.stop(StopReason::ReachedStartDate);
                return None;
            }
            if day > self.window.end {
                continue;
            }
            if post.comments == 0 {
                continue;
            }
            return Some(Ok(post));
        }
    }
}
