// tests/ingest_config.rs
use post_feed::config::{FeedConfig, ENV_CONFIG_PATH, ENV_SOURCE};
use post_feed::SortField;
use std::path::PathBuf;
use std::{env, fs};

#[test]
fn load_from_explicit_path() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("feed.toml");
    fs::write(
        &p,
        r#"
[source]
location = "https://cdn.example.test/posts.csv"

[feed]
default_sort = "reposts"

[server]
static_dir = "assets"
"#,
    )
    .unwrap();

    let cfg = FeedConfig::load_from(&p).unwrap();
    assert_eq!(cfg.source.location, "https://cdn.example.test/posts.csv");
    assert_eq!(cfg.feed.default_sort, SortField::Reposts);
    assert_eq!(cfg.server.static_dir, PathBuf::from("assets"));
}

#[test]
fn bad_toml_is_an_error_with_path_context() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("broken.toml");
    fs::write(&p, "[source\nlocation = 1").unwrap();
    assert!(FeedConfig::load_from(&p).is_err());

    let err = FeedConfig::load_from(&dir.path().join("absent.toml")).unwrap_err();
    assert!(format!("{err:#}").contains("absent.toml"));
}

#[test]
fn repo_config_matches_bundled_data() {
    let cfg = FeedConfig::load_from("config/feed.toml".as_ref()).unwrap();
    assert_eq!(cfg.source.location, "public/posts.csv");
    assert_eq!(cfg.feed.default_sort, SortField::Likes);
    assert!(PathBuf::from(&cfg.source.location).exists());
}

#[serial_test::serial]
#[test]
fn feed_source_env_overrides_file() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("feed.toml");
    fs::write(&p, "[source]\nlocation = \"from-file.csv\"\n").unwrap();

    env::set_var(ENV_CONFIG_PATH, p.display().to_string());
    env::remove_var(ENV_SOURCE);
    assert_eq!(
        FeedConfig::load_default().unwrap().source.location,
        "from-file.csv"
    );

    env::set_var(ENV_SOURCE, "  from-env.csv ");
    assert_eq!(
        FeedConfig::load_default().unwrap().source.location,
        "from-env.csv"
    );

    // blank override is ignored
    env::set_var(ENV_SOURCE, "   ");
    assert_eq!(
        FeedConfig::load_default().unwrap().source.location,
        "from-file.csv"
    );

    env::remove_var(ENV_CONFIG_PATH);
    env::remove_var(ENV_SOURCE);
}
