//! Integration tests for mail-otp.
//!
//! These tests require a real Gmail account and are disabled by default.
//! To run them:
//!
//! ```bash
//! # An OAuth access token with the gmail.readonly scope
//! export MAIL_OTP_TEST_ACCESS_TOKEN="ya29...."
//!
//! # Optional: proxy configuration
//! export MAIL_OTP_TEST_PROXY_HOST="proxy.example.com"
//! export MAIL_OTP_TEST_PROXY_PORT="1080"
//!
//! # Run with the integration-tests feature
//! cargo test --features integration-tests -- --ignored
//! ```

use mail_otp::{
    ConsumptionStore, Error, GmailClient, HarvestConfig, MailSource, OtpHarvester,
    SharedConsumptionRecord, Socks5Proxy, StaticToken,
};
use std::env;
use std::time::Duration;

// ─────────────────────────────────────────────────────────────────────────────
// Test Configuration Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn get_test_token() -> Option<StaticToken> {
    dotenvy::dotenv().ok();
    let token = env::var("MAIL_OTP_TEST_ACCESS_TOKEN").ok()?;
    Some(StaticToken::new(token))
}

fn get_test_proxy() -> Option<Socks5Proxy> {
    let host = env::var("MAIL_OTP_TEST_PROXY_HOST").ok()?;
    let port: u16 = env::var("MAIL_OTP_TEST_PROXY_PORT").ok()?.parse().ok()?;

    let proxy = match (
        env::var("MAIL_OTP_TEST_PROXY_USER").ok(),
        env::var("MAIL_OTP_TEST_PROXY_PASS").ok(),
    ) {
        (Some(user), Some(pass)) => Socks5Proxy::with_auth(&host, port, user, pass),
        _ => Socks5Proxy::new(host, port),
    };

    Some(proxy)
}

fn get_test_config() -> HarvestConfig {
    let mut builder = HarvestConfig::builder().ttl(Duration::from_secs(24 * 60 * 60));

    if let Some(proxy) = get_test_proxy() {
        builder = builder.proxy(proxy);
    }

    builder.build().expect("valid test config")
}

fn get_test_harvester() -> Option<OtpHarvester<GmailClient<StaticToken>>> {
    let token = get_test_token()?;
    let config = get_test_config();
    let client = GmailClient::new(&config, token).ok()?;
    Some(OtpHarvester::new(client, config))
}

// ─────────────────────────────────────────────────────────────────────────────
// Search and Fetch Tests
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
#[ignore = "requires real Gmail account"]
async fn test_search_and_fetch() {
    let harvester = get_test_harvester().expect("Test token from environment variables");

    let refs = harvester
        .source()
        .search_messages("newer_than:7d", 3)
        .await
        .expect("Search failed");
    assert!(refs.len() <= 3);

    for message_ref in refs {
        let message = harvester
            .source()
            .get_message(&message_ref.id)
            .await
            .expect("Fetch failed");
        assert_eq!(message.id, message_ref.id);
        assert!(message.internal_date_ms > 0);
    }
}

#[tokio::test]
#[ignore = "requires real Gmail account"]
async fn test_fetch_candidates() {
    let harvester = get_test_harvester().expect("Test token from environment variables");

    let candidates = harvester
        .fetch_candidates()
        .await
        .expect("Harvest failed");

    // Result depends on what is in the mailbox
    assert!(candidates.len() <= 10);
    for pair in candidates.windows(2) {
        assert!(pair[0].date_ms >= pair[1].date_ms);
    }
    for candidate in &candidates {
        assert!((4..=8).contains(&candidate.code.len()));
        assert!(candidate.code.chars().all(|c| c.is_ascii_digit()));
        println!("{candidate}");
    }
}

#[tokio::test]
#[ignore = "requires real Gmail account"]
async fn test_consumed_codes_are_hidden() {
    let harvester = get_test_harvester().expect("Test token from environment variables");
    let consumed = SharedConsumptionRecord::default();

    let fresh = harvester.fetch_fresh(&consumed).await.expect("Harvest failed");
    let Some(first) = fresh.first() else {
        println!("No fresh codes in mailbox, nothing to consume");
        return;
    };

    consumed.mark_consumed(first.code.clone()).await;
    let again = harvester.fetch_fresh(&consumed).await.expect("Harvest failed");
    assert!(again.iter().all(|c| c.code != first.code));

    let path = env::temp_dir().join(format!("mail-otp-it-{}.json", std::process::id()));
    let store = ConsumptionStore::new(&path);
    store.save(&consumed.snapshot().await).await.expect("Save failed");
    assert!(store.load().await.expect("Load failed").contains(&first.code));
    let _ = std::fs::remove_file(path);
}

// ─────────────────────────────────────────────────────────────────────────────
// Error Tests
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
#[ignore = "requires network access"]
async fn test_invalid_token() {
    let config = get_test_config();
    let client = GmailClient::new(&config, StaticToken::new("invalid-token")).unwrap();

    let err = client
        .search_messages("newer_than:1d", 1)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Unauthorized { .. }));
    assert!(err.requires_reauth());
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_invalid_config_values() {
    let result = HarvestConfig::builder().max_messages(0).build();
    assert!(matches!(result, Err(Error::InvalidConfig { .. })));

    let result = HarvestConfig::builder().api_base("ftp://example.com").build();
    assert!(matches!(result, Err(Error::InvalidConfig { .. })));
}
