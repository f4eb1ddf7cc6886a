//! Cached authentication: a `SessionStore` keeps the cookie set per username so repeated
//! runs skip the login round-trip.

use crate::config::Credentials;
use crate::logsink::LogSink;
use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Saved authentication artifact.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    pub username: String,
    pub cookies: BTreeMap<String, String>,
}

pub trait SessionStore {
    /// `Ok(None)` when nothing was saved for `username`.
    fn load(&self, username: &str) -> Result<Option<SessionData>>;
    fn save(&self, session: &SessionData) -> Result<()>;
}

/// Client side of authentication: either adopt a saved session or log in fresh.
pub trait SessionClient {
    fn restore(&mut self, session: SessionData);
    fn login(&mut self, username: &str, password: &str) -> Result<SessionData>;
}

/// How `authenticate` obtained the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthOutcome {
    Restored,
    LoggedIn,
}

/// Reuse the stored session for `creds.username`, or log in and store the new one.
pub fn authenticate<C, S, L>(client: &mut C, creds: &Credentials, store: &S, log: &L) -> Result<AuthOutcome>
where
    C: SessionClient + ?Sized,
    S: SessionStore + ?Sized,
    L: LogSink + ?Sized,
{
    if let Some(saved) = store.load(&creds.username)? {
        client.restore(saved);
        log.emit("Loaded existing session");
        return Ok(AuthOutcome::Restored);
    }
    log.emit("No session found - logging in...");
    let fresh = client.login(&creds.username, &creds.password)?;
    store.save(&fresh)?;
    log.emit("Login successful");
    Ok(AuthOutcome::LoggedIn)
}

/// One JSON file per username under `dir`.
#[derive(Clone, Debug)]
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self { dir: dir.as_ref().to_path_buf() }
    }

    pub fn path_for(&self, username: &str) -> PathBuf {
        self.dir.join(format!("session-{}.json", username))
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self, username: &str) -> Result<Option<SessionData>> {
        let path = self.path_for(username);
        if !path.exists() {
            return Ok(None);
        }
        let f = fs::File::open(&path).with_context(|| format!("open session {}", path.display()))?;
        let data: SessionData =
            serde_json::from_reader(BufReader::new(f)).with_context(|| format!("parse session {}", path.display()))?;
        Ok(Some(data))
    }

    fn save(&self, session: &SessionData) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(&session.username);
        let f = fs::File::create(&path).with_context(|| format!("create session {}", path.display()))?;
        let mut w = BufWriter::new(f);
        serde_json::to_writer_pretty(&mut w, session)?;
        w.flush()?;
        Ok(())
    }
}

/// In-process store.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: Mutex<BTreeMap<String, SessionData>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: SessionData) -> Self {
        let store = Self::default();
        store.sessions.lock().insert(session.username.clone(), session);
        store
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self, username: &str) -> Result<Option<SessionData>> {
        Ok(self.sessions.lock().get(username).cloned())
    }

    fn save(&self, session: &SessionData) -> Result<()> {
        self.sessions.lock().insert(session.username.clone(), session.clone());
        Ok(())
    }
}
