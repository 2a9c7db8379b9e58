use serde::de::DeserializeOwned;

use crate::error::{FetchError, ParseError};

/// Send `request` and return the body of a successful response.
pub async fn text(request: reqwest::RequestBuilder, url: &str) -> Result<String, FetchError> {
    let response = request
        .send()
        .await
        .map_err(|e| FetchError::from_reqwest(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status,
        });
    }

    let body = response
        .text()
        .await
        .map_err(|e| FetchError::from_reqwest(url, e))?;

    tracing::debug!(url, bytes = body.len(), "fetched");

    Ok(body)
}

pub fn decode<T: DeserializeOwned>(url: &str, body: &str) -> Result<T, ParseError> {
    serde_json::from_str(body).map_err(|inner| ParseError::Feed {
        url: url.to_string(),
        inner,
    })
}
