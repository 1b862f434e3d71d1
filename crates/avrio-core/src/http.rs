//! JSON-over-HTTP helpers shared by the authenticator and scheduler.

use reqwest::Client;
use serde::Serialize;

use crate::CoreError;

/// Append an endpoint path to a host without producing a double slash.
pub(crate) fn join_url(host: &str, path: &str) -> String {
    let host = host.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{host}{path}")
    } else {
        format!("{host}/{path}")
    }
}

/// POST a JSON body and parse the JSON response.
///
/// Non-2xx statuses are turned into `CoreError::Api` carrying the status and
/// response text. `what` names the call in error messages.
pub(crate) async fn post_json<B>(
    http_client: &Client,
    url: &str,
    bearer: Option<&str>,
    body: &B,
    what: &str,
) -> Result<serde_json::Value, CoreError>
where
    B: Serialize + ?Sized,
{
    let mut request = http_client.post(url).json(body);
    if let Some(token) = bearer {
        request = request.bearer_auth(token);
    }

    log::debug!("POST {url} ({what})");

    let response = request
        .send()
        .await
        .map_err(|e| CoreError::Api(format!("{what} request failed: {e}")))?;

    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        return Err(CoreError::Api(format!("{what} failed: {status} - {text}")));
    }

    response
        .json::<serde_json::Value>()
        .await
        .map_err(|e| CoreError::Serialization(format!("parsing {what} response: {e}")))
}

#[cfg(test)]
mod tests {
    use super::join_url;

    #[test]
    fn join_url_avoids_double_slash() {
        assert_eq!(
            join_url("https://host.example.com/", "/api/list"),
            "https://host.example.com/api/list"
        );
        assert_eq!(
            join_url("https://host.example.com", "/api/list"),
            "https://host.example.com/api/list"
        );
    }

    #[test]
    fn join_url_inserts_missing_slash() {
        assert_eq!(
            join_url("https://host.example.com", "api/list"),
            "https://host.example.com/api/list"
        );
    }
}
