// tests/ingest_normalize.rs
use chrono::{TimeZone, Utc};
use post_feed::ingest::normalize::{decode_hashtags, HashtagDecode, DEFAULT_NAME, DEFAULT_USER};
use post_feed::{ingest_bytes, DiagnosticKind};

fn now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 2, 2, 2, 2, 2).unwrap()
}

#[test]
fn structured_hashtags_decode() {
    assert_eq!(
        decode_hashtags(Some(r#"["ai","tech"]"#)),
        HashtagDecode::Decoded(vec!["ai".into(), "tech".into()])
    );
}

#[test]
fn free_text_hashtags_fall_back() {
    let d = decode_hashtags(Some("Check this #ai and #ML out"));
    assert_eq!(
        d,
        HashtagDecode::FellBackToPatternMatch(vec!["ai".into(), "ML".into()])
    );
    assert_eq!(d.into_tags(), vec!["ai".to_string(), "ML".to_string()]);
}

#[test]
fn garbage_numbers_become_zero_never_negative() {
    let csv = "\
id,likes,reposts,replies,views,followers,description
x,abc,-7,NaN,,1e3,hello
";
    let out = ingest_bytes(csv.as_bytes(), now());
    assert_eq!(out.records.len(), 1);
    let r = &out.records[0];
    assert_eq!((r.likes, r.reposts, r.replies, r.views), (0, 0, 0, 0));
    assert_eq!(r.followers, 1);
    // likes, reposts, replies, followers and the absent date were repaired;
    // views was just missing
    assert_eq!(out.stats.repairs, 5);
}

#[test]
fn missing_identity_fields_take_defaults() {
    let csv = "likes,reposts,description,user_posted,name\n1,1,hi,,\n";
    let out = ingest_bytes(csv.as_bytes(), now());
    let r = &out.records[0];
    assert_eq!(r.user, DEFAULT_USER);
    assert_eq!(r.name, DEFAULT_NAME);
    assert!(!r.id.is_empty());
    assert_eq!(r.date, now());
}

#[test]
fn quoted_dates_are_unwrapped() {
    let csv = "likes,reposts,description,date_posted\n1,1,hi,\"'2024-02-29T23:59:59Z'\"\n";
    let out = ingest_bytes(csv.as_bytes(), now());
    assert_eq!(
        out.records[0].date,
        Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 59).unwrap()
    );
    assert_eq!(
        out.count_where(|k| matches!(k, DiagnosticKind::DateDefaulted { .. })),
        0
    );
}

#[test]
fn unrecognized_hashtags_are_empty_with_warning() {
    let csv = "likes,reposts,description,hashtags\n1,1,hi,just words\n";
    let out = ingest_bytes(csv.as_bytes(), now());
    assert!(out.records[0].hashtags.is_empty());
    assert_eq!(
        out.count_where(|k| matches!(k, DiagnosticKind::HashtagUnrecognized { .. })),
        1
    );
}
