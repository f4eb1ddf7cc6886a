mod config;
mod date;
mod logsink;
mod model;
mod pacing;
mod progress;
mod sink;
mod util;

mod comments;
mod crawl;
mod instagram;
mod session;
mod source;
mod walker;

mod aggregate;
mod fetch;
mod recap;
mod table;

pub use crate::config::{load_credentials, ConfigFile, CrawlOptions, CrawlSection, Credentials, RecapOptions, RecapSection};
pub use crate::date::{days_between, parse_ymd, DateWindow, YearMonth};
pub use crate::model::{
    flatten_text, AggregateKey, Comment, CommentRecord, CommentThread, OutputRow, Post, Profile, ScrapedRow,
    DELETED_OWNER, OUTPUT_HEADER, RECAP_HEADER,
};

// Pipeline A: bounded social crawl.
pub use crate::comments::{flatten_thread, CommentCollector};
pub use crate::crawl::{CrawlSummary, SocialCrawl};
pub use crate::instagram::{InstagramClient, DEFAULT_USER_AGENT};
pub use crate::session::{authenticate, AuthOutcome, FileSessionStore, MemorySessionStore, SessionClient, SessionData, SessionStore};
pub use crate::source::{FeedSource, PostStream, ThreadStream};
pub use crate::walker::{FeedWalker, StopReason};

// Pipeline B: table scrape and recap.
pub use crate::aggregate::{Aggregator, MonthlyTotals};
pub use crate::fetch::{HttpFetcher, PageFetcher};
pub use crate::recap::{scrape_page, DataRecap, PageFailure, RecapSummary};
pub use crate::table::{extract_table, opd_from_url, ExtractedTable, TableError};

// Ambient helpers shared by both pipelines.
pub use crate::logsink::{FileLog, LogSink, MemoryLog, TracingLog};
pub use crate::pacing::{DelayWindow, Pacer, PacingPolicy, RecordingPacer, SleepPacer};
pub use crate::progress::{estimate_posts_remaining, estimate_time_remaining, format_duration, make_count_progress, ProgressReporter};
pub use crate::sink::RecordSink;
pub use crate::util::init_tracing_once;
