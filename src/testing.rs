//! In-memory doubles for the domain ports, shared by unit tests.

use crate::domain::external_apis::github::Session;
use crate::domain::models::archive::ArchiveEntry;
use crate::domain::models::page::Page;
use crate::domain::ports::{ArchiveWriter, Clock};
use anyhow::{Error, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Outcome = Result<Page, String>;

/// Replays queued responses per URL, in order.
#[derive(Clone, Default)]
pub struct ScriptedSession {
    responses: Arc<Mutex<HashMap<String, VecDeque<Outcome>>>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl ScriptedSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, url: &str, page: Page) -> Self {
        self.push(url, Ok(page));
        self
    }

    pub fn fail(self, url: &str, message: &str) -> Self {
        self.push(url, Err(message.to_owned()));
        self
    }

    fn push(&self, url: &str, outcome: Outcome) {
        self.responses
            .lock()
            .unwrap()
            .entry(url.to_owned())
            .or_default()
            .push_back(outcome);
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Session for ScriptedSession {
    async fn get(&self, url: &str) -> Result<Page, Error> {
        self.requests.lock().unwrap().push(url.to_owned());
        let outcome = self
            .responses
            .lock()
            .unwrap()
            .get_mut(url)
            .and_then(VecDeque::pop_front)
            .ok_or_else(|| anyhow!("no scripted response for {url}"))?;
        outcome.map_err(|message| anyhow!(message))
    }
}

/// A clock that only moves when slept on.
#[derive(Clone)]
pub struct FakeClock {
    state: Arc<Mutex<(DateTime<Utc>, Vec<Duration>)>>,
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::at(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap())
    }
}

impl FakeClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            state: Arc::new(Mutex::new((now, Vec::new()))),
        }
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.state.lock().unwrap().1.clone()
    }
}

#[async_trait]
impl Clock for FakeClock {
    fn now(&self) -> DateTime<Utc> {
        self.state.lock().unwrap().0
    }

    async fn sleep(&self, duration: Duration) {
        let mut state = self.state.lock().unwrap();
        state.0 += chrono::Duration::from_std(duration).unwrap();
        state.1.push(duration);
    }
}

/// Collects written entries keyed by their slash-separated path.
#[derive(Clone, Default)]
pub struct MemoryArchive {
    files: Arc<Mutex<BTreeMap<String, String>>>,
}

impl MemoryArchive {
    pub fn files(&self) -> BTreeMap<String, String> {
        self.files.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArchiveWriter for MemoryArchive {
    async fn write(&self, entry: &ArchiveEntry) -> Result<(), Error> {
        let key = entry
            .path
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        self.files.lock().unwrap().insert(key, entry.content.clone());
        Ok(())
    }
}

/// Collects the formatted log lines emitted on the current thread while its guard lives.
#[derive(Clone, Default)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let writer = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .without_time()
            .with_level(false)
            .with_target(false)
            .with_ansi(false)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.buffer.lock().unwrap())
            .lines()
            .map(str::to_owned)
            .collect()
    }
}

impl std::io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
