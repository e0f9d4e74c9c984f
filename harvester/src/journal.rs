//! Journal of a harvesting cycle.
//! Every note is emitted through `tracing` as it is appended and kept in the collection
//! so the cycle summary can be built from it.

use std::{fmt, time::Duration};

use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::utils::error::HarvesterResult;

/// Kind of a journal note
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogType {
    /// Progress of the cycle
    Info,
    /// Outcome of a threshold check
    Decision,
    /// Submission or confirmation of a transaction
    Transaction,
}

impl fmt::Display for LogType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogType::Info => write!(f, "info"),
            LogType::Decision => write!(f, "decision"),
            LogType::Transaction => write!(f, "transaction"),
        }
    }
}

/// Journal entry
#[derive(Clone, Debug)]
pub struct JournalEntry {
    pub entry: HarvesterResult<()>,
    pub log_type: LogType,
    pub note: Option<String>,
}

impl JournalEntry {
    /// Create a new instance of a journal entry
    pub fn new(entry: HarvesterResult<()>, log_type: LogType) -> Self {
        Self {
            entry,
            log_type,
            note: None,
        }
    }

    /// Fills the `note` field of the entry
    pub fn note<S: AsRef<str>>(&mut self, text: S) -> &mut Self {
        self.note = Some(text.as_ref().to_string());
        self
    }

    /// Emits the entry
    pub fn commit(&self, cycle: Option<u64>) {
        let note = self.note.as_deref().unwrap_or_default();
        let kind = self.log_type;
        match (&self.entry, kind) {
            (Ok(()), _) => info!(?cycle, %kind, "{}", note),
            (Err(err), LogType::Info) => error!(?cycle, %kind, error = %err, "{}", note),
            (Err(err), _) => warn!(?cycle, %kind, error = %err, "{}", note),
        }
    }

    pub fn is_error(&self) -> bool {
        self.entry.is_err()
    }
}

/// Notes of one cycle
#[derive(Clone, Debug)]
pub struct JournalCollection {
    pub cycle: Option<u64>,
    pub started_at: Instant,
    pub entries: Vec<JournalEntry>,
}

impl JournalCollection {
    /// Opens the collection of cycle `cycle`. `None` is used outside the harvesting loop.
    pub fn open(cycle: Option<u64>) -> Self {
        Self {
            cycle,
            started_at: Instant::now(),
            entries: vec![],
        }
    }

    /// Commits a note and keeps it in the collection
    pub fn append_note<S: AsRef<str>>(
        &mut self,
        entry: HarvesterResult<()>,
        log_type: LogType,
        note: S,
    ) {
        let mut entry = JournalEntry::new(entry, log_type);
        entry.note(note);
        entry.commit(self.cycle);
        self.entries.push(entry);
    }

    pub fn error_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.is_error()).count()
    }

    /// Time spent since the collection was opened
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}
