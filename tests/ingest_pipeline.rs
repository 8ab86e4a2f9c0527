// tests/ingest_pipeline.rs
use chrono::{Duration, Utc};
use post_feed::ingest::source::StaticSource;
use post_feed::{load, load_location, DiagnosticKind, Severity};

const FIXTURE: &str = include_str!("fixtures/posts_5.csv");

fn ids(out: &post_feed::LoadOutcome) -> Vec<&str> {
    out.records.iter().map(|r| r.id.as_str()).collect()
}

#[tokio::test]
async fn five_rows_one_missing_likes_gives_four_sorted_records() {
    let out = load(&StaticSource::from_fixture(FIXTURE)).await;

    assert_eq!(out.records.len(), 4);
    assert_eq!(ids(&out), vec!["e5", "b2", "a1", "d4"]);
    assert!(out.records.windows(2).all(|w| w[0].likes >= w[1].likes));

    assert_eq!(out.stats.rows_read, 5);
    assert_eq!(out.stats.rejected, 1);
    assert_eq!(out.stats.dropped, 0);
    assert_eq!(
        out.stats.rows_read,
        out.stats.records + out.stats.rejected + out.stats.dropped
    );
    assert!(!out.has_errors());
}

#[tokio::test]
async fn fixture_repairs_are_reported() {
    let out = load(&StaticSource::from_fixture(FIXTURE)).await;

    let rejected: Vec<_> = out
        .diagnostics
        .iter()
        .filter(|d| matches!(d.kind, DiagnosticKind::RowRejected { .. }))
        .collect();
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0].row, Some(3));
    assert_eq!(rejected[0].severity, Severity::Info);

    assert_eq!(out.stats.repairs, 3);
    assert_eq!(
        out.count_where(|k| matches!(k, DiagnosticKind::HashtagFallback { .. })),
        1
    );
    assert_eq!(
        out.count_where(|k| matches!(
            k,
            DiagnosticKind::NegativeClamped {
                field: "replies",
                ..
            }
        )),
        1
    );

    let b2 = out.records.iter().find(|r| r.id == "b2").unwrap();
    assert_eq!(b2.hashtags, vec!["rust".to_string(), "ML".to_string()]);
    let a1 = out.records.iter().find(|r| r.id == "a1").unwrap();
    assert_eq!(a1.hashtags, vec!["ai".to_string(), "tech".to_string()]);
    let d4 = out.records.iter().find(|r| r.id == "d4").unwrap();
    assert_eq!(d4.replies, 0);
}

#[tokio::test]
async fn unparsable_date_defaults_to_wall_clock() {
    let before = Utc::now();
    let out = load(&StaticSource::from_fixture(FIXTURE)).await;
    let after = Utc::now();

    let d4 = out.records.iter().find(|r| r.id == "d4").unwrap();
    assert!(d4.date >= before - Duration::seconds(1));
    assert!(d4.date <= after + Duration::seconds(1));
    assert!(out
        .diagnostics
        .iter()
        .any(|d| d.record_id.as_deref() == Some("d4")
            && d.kind
                == DiagnosticKind::DateDefaulted {
                    raw: Some("yesterday".into())
                }));
}

#[tokio::test]
async fn fixture_file_loads_from_disk() {
    let out = load_location("tests/fixtures/posts_5.csv").await;
    assert_eq!(out.records.len(), 4);
}

#[tokio::test]
async fn unreachable_source_is_an_empty_feed_with_load_error() {
    let out = load_location("tests/fixtures/does_not_exist.csv").await;
    assert!(out.records.is_empty());
    assert_eq!(out.diagnostics.len(), 1);
    assert_eq!(out.diagnostics[0].severity, Severity::Error);
    match &out.diagnostics[0].kind {
        DiagnosticKind::LoadError { message } => {
            assert!(message.contains("does_not_exist.csv"), "{message}")
        }
        other => panic!("expected LoadError, got {other:?}"),
    }
}

#[tokio::test]
async fn bundled_sample_data_loads() {
    let out = load_location("public/posts.csv").await;
    assert_eq!(out.stats.rows_read, 8);
    assert_eq!(out.records.len(), 7);
    assert_eq!(out.stats.rejected, 1);
    assert!(!out.has_errors());
    // every record keeps a usable id, even when the CSV leaves it blank
    assert!(out.records.iter().all(|r| !r.id.is_empty()));
    assert_eq!(out.records[0].user, "rustlang");
}
