use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use once_cell::sync::OnceCell;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};

/// API-Football v3 host; every live call goes through it.
pub const API_BASE_URL: &str = "https://v3.football.api-sports.io";
pub const API_KEY_HEADER: &str = "x-apisports-key";

const REQUEST_TIMEOUT_SECS: u64 = 15;
const USER_AGENT: &str = concat!("transfer_predictor/", env!("CARGO_PKG_VERSION"));

static CLIENT: OnceCell<Client> = OnceCell::new();

fn api_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .context("build football api client")
    })
}

pub fn endpoint(path: &str) -> String {
    format!("{API_BASE_URL}/{}", path.trim_start_matches('/'))
}

/// GETs `path` on the football API and returns the body. Non-2xx statuses are errors.
pub fn api_get(path: &str, query: &[(&str, String)], api_key: &str) -> Result<String> {
    let url = endpoint(path);
    let resp = api_client()?
        .get(&url)
        .query(query)
        .header(API_KEY_HEADER, api_key)
        .send()
        .with_context(|| format!("request {url}"))?;
    let status = resp.status();
    let body = resp.text().with_context(|| format!("read body of {url}"))?;
    if !status.is_success() {
        return Err(anyhow!("http {status} from {url}"));
    }
    Ok(body)
}
