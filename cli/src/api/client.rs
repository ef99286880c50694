use crate::api::operation::OperationError;
use crate::config::Endpoints;
use crate::error::Error;
use eyre::WrapErr;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenRequest<'a> {
    yandex_passport_oauth_token: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    iam_token: String,

    #[serde(default)]
    expires_at: String,
}

/// Authenticated connection to the deployment service
#[derive(Clone)]
pub struct Session {
    iam_token: String,
    endpoints: Endpoints,
    client: reqwest::Client,
}

impl Session {
    /// Exchange the OAuth token for a short living IAM token
    pub async fn new(oauth_token: &str, endpoints: Endpoints) -> eyre::Result<Self> {
        let client = reqwest::Client::new();

        let result = client
            .post(format!("{}/iam/v1/tokens", endpoints.iam))
            .json(&TokenRequest {
                yandex_passport_oauth_token: oauth_token,
            })
            .send()
            .await
            .inspect_err(|err| log::error!("{err:?}"))
            .wrap_err(Error::new(
                "Network request failed",
                Some("Could not reach the IAM service."),
            ))?;

        let status = result.status();
        let text = result.text().await?;
        log::debug!("Got status from /iam/v1/tokens: {status}");

        if !status.is_success() {
            log::error!("Got error response: {text}");

            return Err(Error::new(
                "Failed to obtain IAM token",
                Some("Check the \"token\" input holds a valid OAuth token."),
            )
            .into());
        }

        let token: TokenResponse =
            serde_json::from_str(&text).wrap_err("Failed to parse the IAM token response")?;

        log::debug!("IAM token expires at {}", token.expires_at);

        Ok(Session {
            iam_token: token.iam_token,
            endpoints,
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoints.functions, path)
    }

    /// A GET request with the Authorization header
    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .get(self.url(path))
            .bearer_auth(&self.iam_token)
    }

    /// A POST request with the Authorization header
    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .post(self.url(path))
            .bearer_auth(&self.iam_token)
    }

    /// Send a request and decode the JSON reply
    ///
    /// Returns None when the service answers with 404.
    pub async fn send<R>(&self, path: &str, request: reqwest::RequestBuilder) -> eyre::Result<Option<R>>
    where
        R: DeserializeOwned,
    {
        let result = request
            .send()
            .await
            .inspect_err(|err| log::error!("{err:?}"))
            .wrap_err(Error::new(
                "Network request failed",
                Some("Could not reach the serverless functions API."),
            ))?;

        let status = result.status();
        let text = result.text().await?;
        log::debug!("Got status from {path}: {status}");
        log::debug!("Got response from {path}: {text}");

        decode(status, &text)
    }
}

/// Map a reply to its payload, service errors keep their code and message
fn decode<R: DeserializeOwned>(status: StatusCode, text: &str) -> eyre::Result<Option<R>> {
    if status == StatusCode::NOT_FOUND {
        return Ok(None);
    }

    if !status.is_success() {
        log::error!("Got error response: {text}");

        return Err(match serde_json::from_str::<OperationError>(text) {
            Ok(error) if !error.message.is_empty() => error.into(),
            _ => Error::new(
                &format!("Request failed: {status}"),
                Some("Try again in a few seconds."),
            )
            .into(),
        });
    }

    Ok(Some(
        serde_json::from_str(text).wrap_err("Failed to parse the service response")?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::function::Function;

    #[test]
    fn not_found_is_none() {
        let reply = decode::<Function>(StatusCode::NOT_FOUND, "").unwrap();
        assert!(reply.is_none());
    }

    #[test]
    fn success_is_decoded() {
        let reply = decode::<Function>(StatusCode::OK, r#"{"id": "fn1", "name": "api"}"#)
            .unwrap()
            .unwrap();

        assert_eq!(reply.name, "api");
    }

    #[test]
    fn service_error_is_surfaced() {
        let error = decode::<Function>(
            StatusCode::BAD_REQUEST,
            r#"{"code": 3, "message": "bad runtime", "details": []}"#,
        )
        .unwrap_err();

        assert_eq!(error.to_string(), "INVALID_ARGUMENT: bad runtime");
    }

    #[test]
    fn unknown_error_body() {
        let error = decode::<Function>(StatusCode::BAD_GATEWAY, "<html></html>").unwrap_err();

        assert_eq!(
            crate::error::failure_message(&error),
            "Request failed: 502 Bad Gateway"
        );
    }
}
