//! Winner, draw and selection statistics client.

use reqwest::Client;
use url::Url;
use uuid::Uuid;

use super::{ClientError, parse_response};
use crate::objects::REQUESTER_HEADER;
use crate::objects::draw::{
    DrawCompleted, DrawRequest, SelectionStatsQuery, SelectionStatsResponse,
};
use crate::objects::winners::{
    ListWinnersQuery, WinnerPageResponse, WinnerResponse, WinnerStatsResponse,
};

/// Typed HTTP client for the winner endpoints and the one-shot draw.
///
/// Every request is tagged with the requester identity in the
/// `Raffle-Requester` header.
#[derive(Debug, Clone)]
pub struct WinnerClient {
    http: Client,
    base_url: Url,
    requester: String,
}

impl WinnerClient {
    /// Create a new `WinnerClient`.
    pub fn new(base_url: Url, requester: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url,
            requester: requester.into(),
        }
    }

    /// Replace the default `reqwest::Client` with a custom one.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// `GET /api/v1/winners` – one page of winners, newest first.
    pub async fn list_winners(
        &self,
        query: &ListWinnersQuery,
    ) -> Result<WinnerPageResponse, ClientError> {
        let url = self.base_url.join("/api/v1/winners")?;

        let resp = self
            .http
            .get(url)
            .header(REQUESTER_HEADER, &self.requester)
            .query(query)
            .send()
            .await?;

        parse_response(resp).await
    }

    /// `GET /api/v1/winners/latest` – the most recent winner, if any.
    pub async fn latest_winner(&self) -> Result<Option<WinnerResponse>, ClientError> {
        let url = self.base_url.join("/api/v1/winners/latest")?;

        let resp = self
            .http
            .get(url)
            .header(REQUESTER_HEADER, &self.requester)
            .send()
            .await?;

        parse_response(resp).await
    }

    /// `GET /api/v1/winners/{id}`.
    pub async fn get_winner(&self, id: Uuid) -> Result<WinnerResponse, ClientError> {
        let url = self.base_url.join(&format!("/api/v1/winners/{id}"))?;

        let resp = self
            .http
            .get(url)
            .header(REQUESTER_HEADER, &self.requester)
            .send()
            .await?;

        parse_response(resp).await
    }

    /// `GET /api/v1/winners/stats`.
    pub async fn winner_stats(&self) -> Result<WinnerStatsResponse, ClientError> {
        let url = self.base_url.join("/api/v1/winners/stats")?;

        let resp = self
            .http
            .get(url)
            .header(REQUESTER_HEADER, &self.requester)
            .send()
            .await?;

        parse_response(resp).await
    }

    /// `POST /api/v1/draw` – run one draw and wait for the winner.
    ///
    /// A draw already running for this requester is reported as
    /// [`ClientError::Api`] with status 409.
    pub async fn draw(&self, request: &DrawRequest) -> Result<DrawCompleted, ClientError> {
        let url = self.base_url.join("/api/v1/draw")?;

        let resp = self
            .http
            .post(url)
            .header(REQUESTER_HEADER, &self.requester)
            .json(request)
            .send()
            .await?;

        parse_response(resp).await
    }

    /// `GET /api/v1/draw/stats` – counts of the population a draw would use.
    pub async fn selection_stats(
        &self,
        query: &SelectionStatsQuery,
    ) -> Result<SelectionStatsResponse, ClientError> {
        let url = self.base_url.join("/api/v1/draw/stats")?;

        let resp = self
            .http
            .get(url)
            .header(REQUESTER_HEADER, &self.requester)
            .query(query)
            .send()
            .await?;

        parse_response(resp).await
    }
}
