//! Example: List fresh one-time codes from a Gmail inbox.
//!
//! Prints the unconsumed codes from the last few minutes, most recent first,
//! then marks the newest one as used so the next run hides it.
//!
//! # Usage
//!
//! ```bash
//! export MAIL_OTP_ACCESS_TOKEN="ya29...."   # gmail.readonly scope
//! export MAIL_OTP_STORE="consumed.json"     # optional
//! export RUST_LOG=mail_otp=debug            # optional
//!
//! cargo run --example fetch_codes
//! ```

use mail_otp::{
    ConsumptionStore, GmailClient, HarvestConfig, OtpHarvester, SharedConsumptionRecord,
    StaticToken,
};
use std::env;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> mail_otp::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mail_otp=info")),
        )
        .with_target(true)
        .init();

    let token = env::var("MAIL_OTP_ACCESS_TOKEN")
        .expect("MAIL_OTP_ACCESS_TOKEN environment variable required");
    let store_path = env::var("MAIL_OTP_STORE").unwrap_or_else(|_| "consumed.json".into());

    let config = HarvestConfig::builder().build()?;
    let client = GmailClient::new(&config, StaticToken::new(token))?;
    let harvester = OtpHarvester::new(client, config);

    let store = ConsumptionStore::new(store_path);
    let consumed = SharedConsumptionRecord::new(store.load().await?);

    let codes = match harvester.fetch_fresh(&consumed).await {
        Ok(codes) => codes,
        Err(e) if e.requires_reauth() => {
            eprintln!("Access token rejected, sign in again: {e}");
            return Err(e);
        }
        Err(e) => return Err(e),
    };

    if codes.is_empty() {
        println!("No fresh codes.");
        return Ok(());
    }

    for candidate in &codes {
        println!("{candidate}");
    }

    let newest = &codes[0];
    consumed.mark_consumed(newest.code.clone()).await;
    store.save(&consumed.snapshot().await).await?;
    println!("Marked {} as used.", newest.code);

    Ok(())
}
