use feedsmith_core::Result;
use reqwest::Client;
use std::time::Duration;

/// Browser-like identifier; some of the scraped sites serve stripped-down
/// markup to unknown clients.
pub const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Timeout for secondary per-item page fetches. The primary listing fetch
/// keeps the client default.
const ITEM_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

pub fn client() -> Result<Client> {
    Ok(Client::builder().user_agent(USER_AGENT).build()?)
}

/// Fetches a primary listing page. Non-2xx statuses are errors: without the
/// listing the generator has nothing to work with.
pub async fn fetch_page(client: &Client, url: &str) -> Result<String> {
    let response = client.get(url).send().await?.error_for_status()?;
    Ok(response.text().await?)
}

/// Fetches a per-item page for date enrichment. Optional by design: any
/// failure recovers to None and the caller falls back to whatever date it
/// already has.
pub async fn fetch_item_page(client: &Client, url: &str) -> Option<String> {
    let response = client
        .get(url)
        .timeout(ITEM_FETCH_TIMEOUT)
        .send()
        .await
        .ok()?;
    if !response.status().is_success() {
        return None;
    }
    response.text().await.ok()
}
