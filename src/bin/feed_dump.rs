//! Loads a CSV feed (file path or URL) and prints it as plain text.
//!
//! Usage: feed_dump [LOCATION] [--sort likes|reposts|replies|views] [--diagnostics]

use anyhow::{bail, Context, Result};
use chrono::Utc;
use post_feed::{view::render_text, Action, FeedConfig, FeedState, SortField};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default)]
struct Args {
    location: Option<String>,
    sort: Option<SortField>,
    diagnostics: bool,
}

fn parse_args(mut it: impl Iterator<Item = String>) -> Result<Args> {
    let mut args = Args::default();
    while let Some(a) = it.next() {
        match a.as_str() {
            "--sort" => {
                let v = it.next().context("--sort needs a value")?;
                args.sort = Some(v.parse()?);
            }
            "--diagnostics" => args.diagnostics = true,
            flag if flag.starts_with("--") => bail!("unknown flag {flag}"),
            other if args.location.is_none() => args.location = Some(other.to_string()),
            other => bail!("unexpected argument {other}"),
        }
    }
    Ok(args)
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args(std::env::args().skip(1))?;
    let cfg = FeedConfig::load_default()?;
    let location = args.location.unwrap_or(cfg.source.location);
    let sort = args.sort.unwrap_or(cfg.feed.default_sort);

    let outcome = post_feed::load_location(&location).await;
    let state = post_feed::reduce(FeedState::loading(sort), Action::Loaded(outcome));

    print!("{}", render_text(&state, Utc::now()));

    if args.diagnostics {
        println!("----\n{} diagnostics", state.diagnostics.len());
        for d in &state.diagnostics {
            println!("{}", serde_json::to_string(d)?);
        }
    }
    Ok(())
}
