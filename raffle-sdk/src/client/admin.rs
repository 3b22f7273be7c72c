//! Admin API client.
//!
//! All requests carry the plaintext admin secret in the
//! `Raffle-Admin-Authorization` header.

use reqwest::Client;
use url::Url;

use super::{ClientError, parse_response};
use crate::objects::ADMIN_AUTH_HEADER;
use crate::objects::admin::ResetWinnersResponse;

/// Typed HTTP client for the Raffle **Admin API**.
///
/// Authentication uses a plaintext secret verified server-side against an
/// argon2-hashed value.
#[derive(Debug, Clone)]
pub struct AdminClient {
    http: Client,
    base_url: Url,
    admin_secret: String,
}

impl AdminClient {
    /// Create a new `AdminClient`.
    ///
    /// * `base_url` – root URL of the Raffle server.
    /// * `admin_secret` – the plaintext admin secret.
    pub fn new(base_url: Url, admin_secret: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url,
            admin_secret: admin_secret.into(),
        }
    }

    /// Replace the default `reqwest::Client` with a custom one.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// `POST /api/v1/admin/winners/reset` – delete every winner record.
    pub async fn reset_winners(&self) -> Result<ResetWinnersResponse, ClientError> {
        let url = self.base_url.join("/api/v1/admin/winners/reset")?;

        let resp = self
            .http
            .post(url)
            .header(ADMIN_AUTH_HEADER, &self.admin_secret)
            .send()
            .await?;

        parse_response(resp).await
    }
}
