// src/ingest/types.rs
use std::collections::HashMap;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Columns a row must carry (non-empty) to be turned into a [`Record`].
pub const REQUIRED_COLUMNS: [&str; 3] = ["likes", "reposts", "description"];

/// One parsed CSV line keyed by header name. Empty cells count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    cells: HashMap<String, String>,
}

impl RawRow {
    /// Build from a header row and one data row. Extra cells are ignored,
    /// missing cells stay absent; a repeated header keeps its first value.
    pub fn from_pairs<'a, H, V>(headers: H, values: V) -> Self
    where
        H: IntoIterator<Item = &'a str>,
        V: IntoIterator<Item = &'a str>,
    {
        let mut cells = HashMap::new();
        for (h, v) in headers.into_iter().zip(values) {
            cells.entry(h.to_string()).or_insert_with(|| v.to_string());
        }
        Self { cells }
    }

    /// Value of `column`, or `None` when the column is missing or empty.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .get(column)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Required columns this row lacks, in declaration order.
    pub fn missing_required(&self) -> Vec<&'static str> {
        REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|c| self.get(c).is_none())
            .collect()
    }
}

/// A normalized post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: String,
    pub user: String,
    pub name: String,
    pub text: String,
    pub date: DateTime<Utc>,
    pub likes: u64,
    pub reposts: u64,
    pub replies: u64,
    pub views: u64,
    pub hashtags: Vec<String>,
    pub profile_image: Option<String>,
    pub followers: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Source could not be fetched.
    LoadError { message: String },
    /// Payload is not tabular text.
    ParseError { message: String },
    /// A single row could not be read; it was left out.
    RowDropped { message: String },
    /// Field count differs from the header; row kept.
    RowShape { expected: usize, found: usize },
    /// Admission filter exclusion (intentional, not a failure).
    RowRejected { missing: Vec<&'static str> },
    HashtagFallback { raw: String },
    HashtagUnrecognized { raw: String },
    DateDefaulted { raw: Option<String> },
    NumberCoerced {
        field: &'static str,
        raw: String,
        value: u64,
    },
    NegativeClamped { field: &'static str, raw: String },
}

impl DiagnosticKind {
    pub fn severity(&self) -> Severity {
        match self {
            Self::LoadError { .. } | Self::ParseError { .. } | Self::RowDropped { .. } => {
                Severity::Error
            }
            Self::RowRejected { .. } => Severity::Info,
            _ => Severity::Warning,
        }
    }

    /// True for field-level repairs (defaults substituted on a kept row).
    pub fn is_repair(&self) -> bool {
        matches!(
            self,
            Self::HashtagFallback { .. }
                | Self::HashtagUnrecognized { .. }
                | Self::DateDefaulted { .. }
                | Self::NumberCoerced { .. }
                | Self::NegativeClamped { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// 1-based data row number (header excluded), when row-scoped.
    pub row: Option<usize>,
    /// Id of the record the diagnostic belongs to, once known.
    pub record_id: Option<String>,
    pub severity: Severity,
    #[serde(flatten)]
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    pub fn new(row: Option<usize>, kind: DiagnosticKind) -> Self {
        Self {
            row,
            record_id: None,
            severity: kind.severity(),
            kind,
        }
    }

    pub fn for_row(row: usize, kind: DiagnosticKind) -> Self {
        Self::new(Some(row), kind)
    }
}

/// Row accounting for one ingestion run.
/// `rows_read == records + rejected + dropped` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub rows_read: usize,
    pub records: usize,
    pub rejected: usize,
    pub dropped: usize,
    pub repairs: usize,
}

/// Everything a load produces. Failures are folded into `diagnostics`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadOutcome {
    pub records: Vec<Record>,
    pub diagnostics: Vec<Diagnostic>,
    pub stats: IngestStats,
}

impl LoadOutcome {
    /// Empty outcome carrying a single pipeline-level diagnostic.
    pub fn failed(kind: DiagnosticKind) -> Self {
        Self {
            records: Vec::new(),
            diagnostics: vec![Diagnostic::new(None, kind)],
            stats: IngestStats::default(),
        }
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    pub fn count_where(&self, pred: impl Fn(&DiagnosticKind) -> bool) -> usize {
        self.diagnostics.iter().filter(|d| pred(&d.kind)).count()
    }
}

/// Where the CSV payload comes from.
#[async_trait::async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<u8>>;
    fn describe(&self) -> String;
}
