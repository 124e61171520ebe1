use crate::fetch::error::FetchError;
use log::{debug, warn};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

pub(crate) fn build_client(timeout: Duration) -> Result<Client, FetchError> {
    Client::builder()
        .connect_timeout(timeout)
        .timeout(timeout)
        .build()
        .map_err(FetchError::ClientBuild)
}

/// Single-attempt GET decoding a JSON body. Non-2xx statuses become
/// [`FetchError::HttpStatus`].
pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &Client,
    url: &str,
    query: &[(&str, String)],
) -> Result<T, FetchError> {
    debug!("GET {}", url);
    let response = client
        .get(url)
        .query(query)
        .send()
        .await
        .map_err(|e| FetchError::NetworkRequest(url.to_string(), e))?;

    let response = match response.error_for_status() {
        Ok(resp) => resp,
        Err(e) => {
            warn!("HTTP error for {}: {:?}", url, e);
            return Err(match e.status() {
                Some(status) => FetchError::HttpStatus {
                    url: url.to_string(),
                    status,
                    source: e,
                },
                None => FetchError::NetworkRequest(url.to_string(), e),
            });
        }
    };

    let bytes = response
        .bytes()
        .await
        .map_err(|e| FetchError::NetworkRequest(url.to_string(), e))?;
    serde_json::from_slice(&bytes).map_err(|e| FetchError::JsonParse(url.to_string(), e))
}
