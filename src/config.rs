use crate::date::{parse_ymd, DateWindow};
use crate::instagram::DEFAULT_USER_AGENT;
use crate::pacing::PacingPolicy;
use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use time::macros::date;
use time::OffsetDateTime;

/// Login for the feed account.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials").field("username", &self.username).field("password", &"***").finish()
    }
}

/// On-disk config: `[instagram]` credentials plus optional run overrides.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ConfigFile {
    pub instagram: Option<InstagramSection>,
    pub crawl: Option<CrawlSection>,
    pub recap: Option<RecapSection>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct InstagramSection {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct CrawlSection {
    pub profile: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub post_limit: Option<u64>,
    pub posts_per_day: Option<u32>,
    pub output: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub session_dir: Option<PathBuf>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RecapSection {
    pub urls: Option<Vec<String>>,
    pub output: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
}

impl ConfigFile {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            bail!("{} not found: create it with an [instagram] section holding username and password", path.display());
        }
        let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parse {}", path.display()))
    }

    /// TOML only: INI-style bare values (`username = foo`) are rejected with a hint to quote them.
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).context("config is TOML: quote string values, e.g. username = \"me\"")
    }

    /// Credentials are mandatory for the crawl; empty values count as missing.
    pub fn credentials(&self) -> Result<Credentials> {
        let section = self.instagram.as_ref().ok_or_else(|| anyhow!("config is missing the [instagram] section"))?;
        let pick = |v: &Option<String>, key: &str| -> Result<String> {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .ok_or_else(|| anyhow!("config [instagram] is missing '{key}'"))
        };
        Ok(Credentials { username: pick(&section.username, "username")?, password: pick(&section.password, "password")? })
    }
}

/// Read credentials from the config file at `path`.
pub fn load_credentials(path: impl AsRef<Path>) -> Result<Credentials> {
    ConfigFile::load(path)?.credentials()
}

/// Crawl options with defaults and builder chaining.
#[derive(Clone, Debug)]
pub struct CrawlOptions {
    pub profile: String,
    pub window: DateWindow,       // inclusive, UTC days
    pub max_posts: u64,           // examined posts, skipped ones included
    pub posts_per_day: u32,       // ETA heuristic only
    pub output: PathBuf,
    pub session_dir: PathBuf,
    pub pacing: PacingPolicy,
    pub progress: bool,
    pub user_agent: String,
    pub request_timeout: Duration,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            profile: "yoremahm".to_string(),
            window: DateWindow::since(date!(2025 - 07 - 01)),
            max_posts: 1000,
            posts_per_day: 3,
            output: PathBuf::from("kominfoplk_posts.csv"),
            session_dir: PathBuf::from("."),
            pacing: PacingPolicy::default(),
            progress: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout: Duration::from_secs(120),
        }
    }
}

impl CrawlOptions {
    pub fn with_profile(mut self, profile: impl AsRef<str>) -> Self {
        self.profile = profile.as_ref().trim().trim_start_matches('@').to_string();
        self
    }
    pub fn with_window(mut self, window: DateWindow) -> Self {
        self.window = window;
        self
    }
    pub fn with_max_posts(mut self, n: u64) -> Self {
        self.max_posts = n;
        self
    }
    pub fn with_posts_per_day(mut self, n: u32) -> Self {
        self.posts_per_day = n;
        self
    }
    pub fn with_output(mut self, path: impl AsRef<Path>) -> Self {
        self.output = path.as_ref().to_path_buf();
        self
    }
    pub fn with_session_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.session_dir = dir.as_ref().to_path_buf();
        self
    }
    pub fn with_pacing(mut self, pacing: PacingPolicy) -> Self {
        self.pacing = pacing;
        self
    }
    pub fn with_progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }
    pub fn with_user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = ua.into();
        self
    }
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Apply a `[crawl]` section on top of these options.
    pub fn with_section(mut self, s: &CrawlSection) -> Result<Self> {
        if let Some(p) = &s.profile {
            self = self.with_profile(p);
        }
        let start = s.start_date.as_deref().map(parse_ymd).transpose()?.unwrap_or(self.window.start);
        let end = match s.end_date.as_deref() {
            Some(e) => parse_ymd(e)?,
            None if s.start_date.is_some() => OffsetDateTime::now_utc().date(),
            None => self.window.end,
        };
        if end < start {
            bail!("crawl end_date {end} precedes start_date {start}");
        }
        self.window = DateWindow::new(start, end);
        if let Some(n) = s.post_limit {
            self.max_posts = n;
        }
        if let Some(n) = s.posts_per_day {
            self.posts_per_day = n;
        }
        if let Some(p) = &s.output {
            self.output = p.clone();
        }
        if let Some(d) = &s.session_dir {
            self.session_dir = d.clone();
        }
        Ok(self)
    }
}

/// Recap options.
#[derive(Clone, Debug)]
pub struct RecapOptions {
    pub urls: Vec<String>,
    pub output: PathBuf,
    pub progress: bool,
    pub user_agent: String,
    pub request_timeout: Duration,
}

impl Default for RecapOptions {
    fn default() -> Self {
        Self {
            urls: vec!["https://kel-mungkubaru.palangkaraya.go.id/data-real-time/".to_string()],
            output: PathBuf::from("rekap_data_per_opd.csv"),
            progress: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl RecapOptions {
    pub fn with_urls<I, S>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.urls = urls.into_iter().map(Into::into).collect();
        self
    }
    pub fn with_output(mut self, path: impl AsRef<Path>) -> Self {
        self.output = path.as_ref().to_path_buf();
        self
    }
    pub fn with_progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_section(mut self, s: &RecapSection) -> Self {
        if let Some(urls) = &s.urls {
            self.urls = urls.clone();
        }
        if let Some(p) = &s.output {
            self.output = p.clone();
        }
        self
    }
}
