use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING};
use reqwest::Client;

const APP_USER_AGENT: &str = concat!("StreamLauncher/", env!("CARGO_PKG_VERSION"));

/// Shared client for catalog queries and artifact downloads.
///
/// `identity` encoding keeps streamed byte counts equal to the asset sizes the
/// catalog declares, which the download progress is scaled against.
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));

    Client::builder()
        .user_agent(APP_USER_AGENT)
        .default_headers(default_headers)
        .build()
}
