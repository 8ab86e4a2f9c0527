// src/view.rs
//! Presentation: number/age formatting, per-post view models, and the HTML
//! and plain-text renderings of a [`FeedState`].

use chrono::{DateTime, Utc};
use html_escape::{encode_double_quoted_attribute, encode_text};
use serde::Serialize;

use crate::feed::{FeedState, LoadStatus, SortField};
use crate::ingest::types::Record;

pub const DEFAULT_AVATAR: &str =
    "https://abs.twimg.com/sticky/default_profile_images/default_profile_normal.png";

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// `999 → "999"`, `1500 → "1.5K"`, `2_500_000 → "2.5M"`.
pub fn format_count(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.1}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}

/// Compact relative age (`1d`, `3d`, `2w`, `4mo`, `1y`).
/// Partial days round up; direction (past/future) is ignored.
pub fn age_label(date: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff_ms = (now - date).num_milliseconds().abs();
    let days = (diff_ms + DAY_MS - 1) / DAY_MS;

    if days == 1 {
        "1d".to_string()
    } else if days < 7 {
        format!("{days}d")
    } else if days < 30 {
        format!("{}w", days / 7)
    } else if days < 365 {
        format!("{}mo", days / 30)
    } else {
        format!("{}y", days / 365)
    }
}

/// What a single post card shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostView {
    pub id: String,
    pub name: String,
    pub handle: String,
    pub age: String,
    pub text: String,
    pub hashtags: Vec<String>,
    pub replies: String,
    pub reposts: String,
    pub likes: String,
    pub views: String,
    pub profile_image: String,
}

impl PostView {
    pub fn from_record(r: &Record, now: DateTime<Utc>) -> Self {
        Self {
            id: r.id.clone(),
            name: r.name.clone(),
            handle: format!("@{}", r.user),
            age: age_label(r.date, now),
            text: r.text.clone(),
            hashtags: r.hashtags.iter().map(|t| format!("#{t}")).collect(),
            replies: format_count(r.replies),
            reposts: format_count(r.reposts),
            likes: format_count(r.likes),
            views: format_count(r.views),
            profile_image: r
                .profile_image
                .clone()
                .unwrap_or_else(|| DEFAULT_AVATAR.to_string()),
        }
    }
}

/// JSON shape of `/feed`.
#[derive(Debug, Clone, Serialize)]
pub struct FeedView {
    pub status: LoadStatus,
    pub sort: SortField,
    pub count: usize,
    pub posts: Vec<PostView>,
}

pub fn feed_view(state: &FeedState, now: DateTime<Utc>) -> FeedView {
    FeedView {
        status: state.status,
        sort: state.sort,
        count: state.records.len(),
        posts: state
            .records
            .iter()
            .map(|r| PostView::from_record(r, now))
            .collect(),
    }
}

/// Full HTML page for the feed. While loading, only the spinner text shows.
pub fn render_html(state: &FeedState, now: DateTime<Utc>) -> String {
    let mut out = String::with_capacity(4096 + state.records.len() * 768);
    out.push_str(
        "<!doctype html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Home</title>\n<link rel=\"stylesheet\" href=\"/static/feed.css\">\n\
         </head>\n<body>\n",
    );

    if state.status == LoadStatus::Loading {
        out.push_str(
            "<div class=\"loading\"><div class=\"loading-spinner\"></div>\
             <p>Loading posts...</p></div>\n</body>\n</html>\n",
        );
        return out;
    }

    out.push_str("<main class=\"feed\">\n<header class=\"feed-header\">\n<h1>Home</h1>\n");
    out.push_str(&format!(
        "<div class=\"post-counter\">Showing {} posts</div>\n",
        state.records.len()
    ));
    out.push_str("<nav class=\"sort-controls\"><span>Sort by:</span>\n");
    for f in SortField::ALL {
        let class = if f == state.sort {
            "sort-btn active"
        } else {
            "sort-btn"
        };
        out.push_str(&format!(
            "<a class=\"{class}\" href=\"/?sort={}\">{}</a>\n",
            f.as_str(),
            f.label()
        ));
    }
    out.push_str("</nav>\n</header>\n<section class=\"posts\">\n");

    for r in &state.records {
        let v = PostView::from_record(r, now);
        out.push_str(&format!(
            "<article class=\"post\" id=\"post-{}\">\n",
            encode_double_quoted_attribute(&v.id)
        ));
        out.push_str(&format!(
            "<header class=\"post-header\"><img class=\"profile-image\" src=\"{}\" alt=\"{}\">\
             <span class=\"display-name\">{}</span> <span class=\"username\">{}</span> \
             <span class=\"date\">{}</span></header>\n",
            encode_double_quoted_attribute(&v.profile_image),
            encode_double_quoted_attribute(&v.name),
            encode_text(&v.name),
            encode_text(&v.handle),
            encode_text(&v.age),
        ));
        out.push_str(&format!(
            "<p class=\"post-text\">{}</p>\n",
            encode_text(&v.text)
        ));
        if !v.hashtags.is_empty() {
            out.push_str("<div class=\"hashtags\">");
            for tag in &v.hashtags {
                out.push_str(&format!(
                    "<span class=\"hashtag\">{}</span>",
                    encode_text(tag)
                ));
            }
            out.push_str("</div>\n");
        }
        out.push_str(&format!(
            "<footer class=\"post-engagement\">\
             <span class=\"replies\">{}</span><span class=\"reposts\">{}</span>\
             <span class=\"likes\">{}</span><span class=\"views\">{}</span></footer>\n",
            v.replies, v.reposts, v.likes, v.views
        ));
        out.push_str("</article>\n");
    }

    out.push_str("</section>\n</main>\n</body>\n</html>\n");
    out
}

/// Plain-text rendering for terminals.
pub fn render_text(state: &FeedState, now: DateTime<Utc>) -> String {
    if state.status == LoadStatus::Loading {
        return "Loading posts...\n".to_string();
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Home · Showing {} posts · sorted by {}\n",
        state.records.len(),
        state.sort
    ));
    for r in &state.records {
        let v = PostView::from_record(r, now);
        out.push_str("----\n");
        out.push_str(&format!("{} {} · {}\n", v.name, v.handle, v.age));
        out.push_str(&v.text);
        out.push('\n');
        if !v.hashtags.is_empty() {
            out.push_str(&v.hashtags.join(" "));
            out.push('\n');
        }
        out.push_str(&format!(
            "replies {} · reposts {} · likes {} · views {}\n",
            v.replies, v.reposts, v.likes, v.views
        ));
    }
    out
}
