pub mod dead_letter;
pub mod nominatim;
pub mod opencage;
pub mod wikidata;

use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = concat!("geocache/", env!("CARGO_PKG_VERSION"));

fn http_client(user_agent: &str, timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .build()
}
