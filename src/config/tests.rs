use clap::Parser;

use super::*;

fn raw_with_secret() -> RawSettings {
    let mut raw = RawSettings::default();
    raw.revalidation.secret = Some("webhook-secret".to_string());
    raw
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = raw_with_secret();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());

    let overrides = ServeOverrides {
        server_port: Some(4321),
        log_level: Some("debug".to_string()),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn missing_secret_is_rejected() {
    let err = Settings::from_raw(RawSettings::default()).expect_err("secret required");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "revalidation.secret",
            ..
        }
    ));
}

#[test]
fn blank_secret_is_rejected() {
    let mut raw = RawSettings::default();
    raw.revalidation.secret = Some("   ".to_string());
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn default_paths_cover_home_and_listings() {
    let settings = Settings::from_raw(raw_with_secret()).expect("valid settings");
    let paths: Vec<&str> = settings
        .revalidation
        .default_paths
        .iter()
        .map(SitePath::as_str)
        .collect();

    assert!(paths.contains(&"/"));
    assert_eq!(paths.len(), DEFAULT_REVALIDATION_PATHS.len());
}

#[test]
fn configured_default_paths_are_normalised_and_deduplicated() {
    let mut raw = raw_with_secret();
    raw.revalidation.default_paths = Some(vec![
        "/".to_string(),
        "blog".to_string(),
        "/blog/".to_string(),
    ]);

    let settings = Settings::from_raw(raw).expect("valid settings");
    let paths: Vec<&str> = settings
        .revalidation
        .default_paths
        .iter()
        .map(SitePath::as_str)
        .collect();
    assert_eq!(paths, vec!["/", "/blog"]);
}

#[test]
fn invalid_or_empty_default_paths_are_rejected() {
    let mut raw = raw_with_secret();
    raw.revalidation.default_paths = Some(vec!["https://example.com/".to_string()]);
    assert!(Settings::from_raw(raw).is_err());

    let mut raw = raw_with_secret();
    raw.revalidation.default_paths = Some(Vec::new());
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn cache_defaults() {
    let settings = Settings::from_raw(raw_with_secret()).expect("valid settings");
    assert!(settings.cache.enabled);
    assert_eq!(
        settings.cache.response_limit.get(),
        DEFAULT_CACHE_RESPONSE_LIMIT
    );
    assert_eq!(
        settings.cache.body_limit_bytes.get(),
        DEFAULT_CACHE_BODY_LIMIT_BYTES
    );
}

#[test]
fn zero_cache_limit_is_rejected() {
    let mut raw = raw_with_secret();
    raw.cache.response_limit = Some(0);
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn origin_url_must_be_http() {
    let mut raw = raw_with_secret();
    raw.origin.url = Some("ftp://renderer.internal".to_string());
    assert!(Settings::from_raw(raw).is_err());

    let mut raw = raw_with_secret();
    raw.apply_serve_overrides(&ServeOverrides {
        origin_url: Some("http://127.0.0.1:4000".to_string()),
        ..Default::default()
    });
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(
        settings.origin.url.map(|url| url.to_string()),
        Some("http://127.0.0.1:4000/".to_string())
    );
}

#[test]
fn poll_page_prefix_defaults() {
    let settings = Settings::from_raw(raw_with_secret()).expect("valid settings");
    assert_eq!(settings.polls.page_prefix.as_str(), "/polls");
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = raw_with_secret();
    raw.apply_serve_overrides(&ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    });
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["clubhouse"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_serve_overrides() {
    let args = CliArgs::parse_from([
        "clubhouse",
        "serve",
        "--server-host",
        "0.0.0.0",
        "--database-url",
        "postgres://override",
    ]);

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert_eq!(serve.overrides.server_host.as_deref(), Some("0.0.0.0"));
            assert_eq!(
                serve.overrides.database_url.as_deref(),
                Some("postgres://override")
            );
        }
    }
}
