//! WebSocket client for the draw stream.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use url::Url;

use super::ClientError;
use crate::objects::REQUESTER_HEADER;
use crate::objects::ws::{WsClientMessage, WsCloseCode, WsServerMessage};

/// An open `GET /api/v1/draw/ws` connection bound to one requester.
pub struct DrawSession {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl DrawSession {
    /// Connect to the draw stream.
    ///
    /// `base_url` may use `http(s)` or `ws(s)`; HTTP schemes are rewritten to
    /// their WebSocket counterpart.
    pub async fn connect(base_url: &Url, requester: &str) -> Result<Self, ClientError> {
        let mut url = base_url.join("/api/v1/draw/ws")?;
        let scheme = match url.scheme() {
            "https" | "wss" => "wss",
            _ => "ws",
        };
        // `set_scheme` only fails for cannot-be-a-base URLs, which `join` already rejected.
        let _ = url.set_scheme(scheme);

        let mut request = url.as_str().into_client_request()?;
        let value = HeaderValue::from_str(requester).map_err(|_| ClientError::InvalidHeader)?;
        request.headers_mut().insert(REQUESTER_HEADER, value);

        let (stream, _) = connect_async(request).await?;
        Ok(Self { stream })
    }

    /// Ask the server to start a draw. `None` uses the server's default.
    pub async fn select(
        &mut self,
        exclude_previous_winners: Option<bool>,
    ) -> Result<(), ClientError> {
        self.send(&WsClientMessage::Select {
            exclude_previous_winners,
        })
        .await
    }

    /// Cancel the in-flight draw.
    pub async fn cancel(&mut self) -> Result<(), ClientError> {
        self.send(&WsClientMessage::Cancel).await
    }

    /// Wait for the next server frame. Returns `None` once the server closes
    /// the connection.
    pub async fn next_message(&mut self) -> Option<Result<WsServerMessage, ClientError>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => {
                    return Some(serde_json::from_str(&text).map_err(ClientError::Json));
                }
                Ok(Message::Close(_)) => return None,
                Ok(_) => continue,
                Err(e) => return Some(Err(e.into())),
            }
        }
    }

    /// Close the connection with [`WsCloseCode::NORMAL`].
    pub async fn close(mut self) -> Result<(), ClientError> {
        let frame = CloseFrame {
            code: CloseCode::from(WsCloseCode::NORMAL),
            reason: "".into(),
        };
        self.stream.close(Some(frame)).await?;
        Ok(())
    }

    async fn send(&mut self, msg: &WsClientMessage) -> Result<(), ClientError> {
        let text = serde_json::to_string(msg)?;
        self.stream.send(Message::Text(text)).await?;
        Ok(())
    }
}
