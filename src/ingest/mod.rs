// src/ingest/mod.rs
//! CSV ingestion: fetch → parse rows → admission filter → normalize → sort.
//!
//! No failure escapes this module. Unreachable sources and unparsable
//! payloads come back as an empty [`LoadOutcome`] with one error diagnostic;
//! bad rows and bad fields are dropped or repaired and reported.

pub mod normalize;
pub mod source;
pub mod types;

use std::time::Instant;

use chrono::{DateTime, Utc};
use csv::{ReaderBuilder, StringRecord, Trim};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use once_cell::sync::OnceCell;

use crate::feed::{sort_records, SortField};
use crate::ingest::types::{
    Diagnostic, DiagnosticKind, FeedSource, IngestStats, LoadOutcome, RawRow,
};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("feed_rows_total", "Data rows read from the CSV payload.");
        describe_counter!("feed_records_total", "Rows turned into records.");
        describe_counter!(
            "feed_rows_rejected_total",
            "Rows excluded by the admission filter (missing likes/reposts/description)."
        );
        describe_counter!("feed_rows_dropped_total", "Rows that could not be read.");
        describe_counter!("feed_repairs_total", "Fields replaced by a default.");
        describe_counter!(
            "feed_load_errors_total",
            "Source fetch or payload parse failures."
        );
        describe_histogram!("feed_parse_ms", "Parse + normalize time in milliseconds.");
        describe_gauge!("feed_last_load_ts", "Unix ts of the last completed ingest.");
    });
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("failed to load feed from {location}: {reason}")]
    Load { location: String, reason: String },
    #[error("feed payload is not valid CSV: {0}")]
    Parse(String),
}

impl From<IngestError> for DiagnosticKind {
    fn from(e: IngestError) -> Self {
        let message = e.to_string();
        match e {
            IngestError::Load { .. } => DiagnosticKind::LoadError { message },
            IngestError::Parse(_) => DiagnosticKind::ParseError { message },
        }
    }
}

/// Rows split out of a payload, before admission and normalization.
#[derive(Debug, Default)]
pub struct ParsedRows {
    /// `(1-based data row number, row)`
    pub rows: Vec<(usize, RawRow)>,
    pub rows_read: usize,
    pub dropped: usize,
    pub diagnostics: Vec<Diagnostic>,
}

/// Split a CSV payload into [`RawRow`]s keyed by header.
///
/// Fails only when there is no usable header row. Unreadable data rows are
/// dropped and reported; ragged rows are kept and reported.
pub fn parse_rows(payload: &[u8]) -> Result<ParsedRows, IngestError> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::Headers)
        .from_reader(payload);

    let headers = rdr
        .headers()
        .map_err(|e| IngestError::Parse(e.to_string()))?
        .clone();
    if headers.iter().all(str::is_empty) {
        return Err(IngestError::Parse("missing header row".to_string()));
    }

    let mut out = ParsedRows::default();
    for (i, res) in rdr.byte_records().enumerate() {
        let row = i + 1;
        out.rows_read += 1;

        let record = res
            .map_err(|e| e.to_string())
            .and_then(|br| StringRecord::from_byte_record(br).map_err(|e| e.to_string()));
        let record = match record {
            Ok(r) => r,
            Err(message) => {
                tracing::warn!(target: "ingest", row, %message, "row dropped");
                out.dropped += 1;
                out.diagnostics
                    .push(Diagnostic::for_row(row, DiagnosticKind::RowDropped { message }));
                continue;
            }
        };

        if record.len() != headers.len() {
            tracing::warn!(
                target: "ingest",
                row,
                expected = headers.len(),
                found = record.len(),
                "ragged row"
            );
            out.diagnostics.push(Diagnostic::for_row(
                row,
                DiagnosticKind::RowShape {
                    expected: headers.len(),
                    found: record.len(),
                },
            ));
        }

        out.rows
            .push((row, RawRow::from_pairs(headers.iter(), record.iter())));
    }

    Ok(out)
}

/// Everything after the fetch. `now` stands in for unparsable dates.
/// Records come back sorted by likes, descending.
pub fn ingest_bytes(payload: &[u8], now: DateTime<Utc>) -> LoadOutcome {
    ensure_metrics_described();
    let t0 = Instant::now();

    let parsed = match parse_rows(payload) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(target: "ingest", error = %e, "feed parse failed");
            counter!("feed_load_errors_total", "kind" => "parse").increment(1);
            return LoadOutcome::failed(e.into());
        }
    };

    let mut diagnostics = parsed.diagnostics;
    let mut records = Vec::with_capacity(parsed.rows.len());
    let mut rejected = 0usize;

    for (row, raw) in parsed.rows {
        let missing = raw.missing_required();
        if !missing.is_empty() {
            tracing::debug!(target: "ingest", row, ?missing, "row not admitted");
            rejected += 1;
            diagnostics.push(Diagnostic::for_row(
                row,
                DiagnosticKind::RowRejected { missing },
            ));
            continue;
        }
        let (record, repairs) = normalize::normalize_row(row, &raw, now);
        diagnostics.extend(repairs);
        records.push(record);
    }

    sort_records(&mut records, SortField::Likes);

    let stats = IngestStats {
        rows_read: parsed.rows_read,
        records: records.len(),
        rejected,
        dropped: parsed.dropped,
        repairs: diagnostics.iter().filter(|d| d.kind.is_repair()).count(),
    };

    // Telemetry
    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("feed_parse_ms").record(ms);
    counter!("feed_rows_total").increment(stats.rows_read as u64);
    counter!("feed_records_total").increment(stats.records as u64);
    counter!("feed_rows_rejected_total").increment(stats.rejected as u64);
    counter!("feed_rows_dropped_total").increment(stats.dropped as u64);
    counter!("feed_repairs_total").increment(stats.repairs as u64);
    gauge!("feed_last_load_ts").set(now.timestamp() as f64);

    tracing::info!(
        target: "ingest",
        rows = stats.rows_read,
        records = stats.records,
        rejected = stats.rejected,
        dropped = stats.dropped,
        repairs = stats.repairs,
        "feed ingested"
    );

    LoadOutcome {
        records,
        diagnostics,
        stats,
    }
}

/// Fetch and ingest one source. Never fails; see [`LoadOutcome::diagnostics`].
pub async fn load(source: &dyn FeedSource) -> LoadOutcome {
    ensure_metrics_described();

    let payload = match source.fetch().await {
        Ok(b) => b,
        Err(e) => {
            let err = IngestError::Load {
                location: source.describe(),
                reason: format!("{e:#}"),
            };
            tracing::warn!(target: "ingest", error = %err, "feed load failed");
            counter!("feed_load_errors_total", "kind" => "load").increment(1);
            return LoadOutcome::failed(err.into());
        }
    };

    ingest_bytes(&payload, Utc::now())
}

/// [`load`] for a location string (file path or http(s) URL).
pub async fn load_location(location: &str) -> LoadOutcome {
    let src = source::source_for(location);
    load(src.as_ref()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn headers_are_matched_regardless_of_order() {
        let csv = "likes,description,reposts,id\n5,hi,1,a\n";
        let out = ingest_bytes(csv.as_bytes(), now());
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].id, "a");
        assert_eq!(out.records[0].likes, 5);
        assert_eq!(out.records[0].reposts, 1);
    }

    #[test]
    fn empty_payload_is_a_parse_error() {
        let out = ingest_bytes(b"", now());
        assert!(out.records.is_empty());
        assert_eq!(out.diagnostics.len(), 1);
        assert!(matches!(
            out.diagnostics[0].kind,
            DiagnosticKind::ParseError { .. }
        ));
    }

    #[test]
    fn invalid_utf8_header_is_a_parse_error() {
        let out = ingest_bytes(b"li\xffkes,reposts\n1,2\n", now());
        assert!(out.records.is_empty());
        assert!(out.has_errors());
    }

    #[test]
    fn invalid_utf8_row_is_dropped_alone() {
        let mut csv = b"id,likes,reposts,description\n".to_vec();
        csv.extend_from_slice(b"a,1,1,bad \xff bytes\n");
        csv.extend_from_slice(b"b,2,2,fine\n");
        let out = ingest_bytes(&csv, now());
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].id, "b");
        assert_eq!(out.stats.dropped, 1);
        assert_eq!(out.stats.rows_read, 2);
        assert_eq!(out.diagnostics[0].row, Some(1));
        assert!(matches!(
            out.diagnostics[0].kind,
            DiagnosticKind::RowDropped { .. }
        ));
    }

    #[test]
    fn ragged_rows_are_kept_with_a_warning() {
        let csv = "id,likes,reposts,description,views\nx,3,1,short row\ny,4,1,long row,10,extra\n";
        let out = ingest_bytes(csv.as_bytes(), now());
        assert_eq!(out.records.len(), 2);
        assert_eq!(
            out.count_where(|k| matches!(k, DiagnosticKind::RowShape { .. })),
            2
        );
        let y = out.records.iter().find(|r| r.id == "y").unwrap();
        assert_eq!(y.views, 10);
    }

    #[test]
    fn rejections_are_info_not_repairs() {
        let csv = "id,likes,reposts,description\na,,1,no likes\nb,1,,no reposts\nc,1,1,\n";
        let out = ingest_bytes(csv.as_bytes(), now());
        assert!(out.records.is_empty());
        assert_eq!(out.stats.rejected, 3);
        assert_eq!(out.stats.repairs, 0);
        assert!(!out.has_errors());
        assert_eq!(
            out.diagnostics[2].kind,
            DiagnosticKind::RowRejected {
                missing: vec!["description"]
            }
        );
    }

    #[test]
    fn ingest_error_maps_to_diagnostic_kind() {
        let k: DiagnosticKind = IngestError::Parse("boom".into()).into();
        assert_eq!(
            k,
            DiagnosticKind::ParseError {
                message: "feed payload is not valid CSV: boom".into()
            }
        );
    }
}
