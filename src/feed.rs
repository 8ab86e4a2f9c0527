//! # Feed state
//!
//! The feed is an immutable snapshot ([`FeedState`]) advanced by a pure
//! reducer ([`reduce`]). Two things ever change it: the initial load
//! finishing, and a sort request.
//!
//! [`FeedStore`] is the one place the live snapshot is kept inside the
//! server; handlers go through [`FeedStore::dispatch`] and
//! [`FeedStore::read`].

use std::fmt;
use std::str::FromStr;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::ingest::types::{Diagnostic, IngestStats, LoadOutcome, Record};

/// Engagement metric used as a sort key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    #[default]
    Likes,
    Reposts,
    Replies,
    Views,
}

impl SortField {
    pub const ALL: [SortField; 4] = [Self::Likes, Self::Reposts, Self::Replies, Self::Views];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Likes => "likes",
            Self::Reposts => "reposts",
            Self::Replies => "replies",
            Self::Views => "views",
        }
    }

    /// Human label for sort controls.
    pub fn label(self) -> &'static str {
        match self {
            Self::Likes => "Likes",
            Self::Reposts => "Reposts",
            Self::Replies => "Replies",
            Self::Views => "Views",
        }
    }

    pub fn value_of(self, r: &Record) -> u64 {
        match self {
            Self::Likes => r.likes,
            Self::Reposts => r.reposts,
            Self::Replies => r.replies,
            Self::Views => r.views,
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown sort field '{0}' (expected likes, reposts, replies or views)")]
pub struct UnknownSortField(pub String);

impl FromStr for SortField {
    type Err = UnknownSortField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "likes" => Ok(Self::Likes),
            "reposts" => Ok(Self::Reposts),
            "replies" => Ok(Self::Replies),
            "views" => Ok(Self::Views),
            _ => Err(UnknownSortField(s.to_string())),
        }
    }
}

/// Order records by `field`, highest first. Ties keep no particular order.
pub fn sort_records(records: &mut [Record], field: SortField) {
    records.sort_by(|a, b| field.value_of(b).cmp(&field.value_of(a)));
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStatus {
    #[default]
    Loading,
    Ready,
}

/// One snapshot of the feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeedState {
    pub status: LoadStatus,
    pub sort: SortField,
    pub records: Vec<Record>,
    pub diagnostics: Vec<Diagnostic>,
    pub stats: IngestStats,
}

impl FeedState {
    /// Fresh, still-loading state that will order by `sort` once data arrives.
    pub fn loading(sort: SortField) -> Self {
        Self {
            sort,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub enum Action {
    Loaded(LoadOutcome),
    SortBy(SortField),
}

/// Pure state transition.
pub fn reduce(state: FeedState, action: Action) -> FeedState {
    match action {
        Action::Loaded(outcome) => {
            let mut records = outcome.records;
            sort_records(&mut records, state.sort);
            FeedState {
                status: LoadStatus::Ready,
                sort: state.sort,
                records,
                diagnostics: outcome.diagnostics,
                stats: outcome.stats,
            }
        }
        Action::SortBy(field) => {
            let mut next = state;
            next.sort = field;
            sort_records(&mut next.records, field);
            next
        }
    }
}

/// Owner of the live snapshot.
#[derive(Debug, Default)]
pub struct FeedStore {
    inner: RwLock<FeedState>,
}

impl FeedStore {
    pub fn new(initial: FeedState) -> Self {
        Self {
            inner: RwLock::new(initial),
        }
    }

    /// Apply `action` to the live snapshot.
    pub fn dispatch(&self, action: Action) {
        let mut guard = match self.inner.write() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        };
        let current = std::mem::take(&mut *guard);
        *guard = reduce(current, action);
    }

    /// Owned copy of the current snapshot.
    pub fn snapshot(&self) -> FeedState {
        self.read(FeedState::clone)
    }

    /// Run `f` against the current snapshot without copying it.
    pub fn read<T>(&self, f: impl FnOnce(&FeedState) -> T) -> T {
        let guard = match self.inner.read() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        };
        f(&guard)
    }
}
