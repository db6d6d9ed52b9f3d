//! Cliente HTTP da API GameSense.
//!
//! Sem estado além do endereço alvo e sem retry: a política de repetição
//! fica com o [`controller`](crate::controller).

use crate::types::{Binding, GameEvent, GameMetadata, ServerAddress};
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use std::time::Duration;

/// Timeout de cada requisição (conexão + resposta).
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Endpoints usados (`http://{address}/{path}`).
pub mod endpoint {
    pub const BIND_GAME_EVENT: &str = "bind_game_event";
    pub const GAME_METADATA: &str = "game_metadata";
    pub const REMOVE_GAME: &str = "remove_game";
    pub const GAME_EVENT: &str = "game_event";
}

/// Falha de requisição à API. Todas as variantes são erros de requisição:
/// transporte, status não-2xx ou payload não serializável.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("falha ao criar cliente HTTP: {0}")]
    Client(#[source] reqwest::Error),

    #[error("falha ao serializar payload para {path}: {source}")]
    Serialize {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("falha na requisição {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("falha na requisição {url}: HTTP {status} - {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },
}

impl ApiError {
    /// Status HTTP, quando a API chegou a responder.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Operações da API GameSense.
///
/// Implementações só precisam de [`post_json`](Self::post_json); as
/// operações nomeadas montam o path e serializam o payload.
pub trait GameSenseApi: Send + 'static {
    /// POST de um corpo JSON já serializado em `path`.
    fn post_json(&self, path: &str, body: Vec<u8>) -> Result<(), ApiError>;

    fn post<T: Serialize>(&self, path: &str, payload: &T) -> Result<(), ApiError>
    where
        Self: Sized,
    {
        let body = serde_json::to_vec(payload).map_err(|source| ApiError::Serialize {
            path: path.to_owned(),
            source,
        })?;
        self.post_json(path, body)
    }

    fn bind_game_event(&self, binding: &Binding) -> Result<(), ApiError>
    where
        Self: Sized,
    {
        self.post(endpoint::BIND_GAME_EVENT, binding)
    }

    fn game_metadata(&self, metadata: &GameMetadata) -> Result<(), ApiError>
    where
        Self: Sized,
    {
        self.post(endpoint::GAME_METADATA, metadata)
    }

    fn remove_game(&self, metadata: &GameMetadata) -> Result<(), ApiError>
    where
        Self: Sized,
    {
        self.post(endpoint::REMOVE_GAME, metadata)
    }

    fn game_event(&self, event: &GameEvent) -> Result<(), ApiError>
    where
        Self: Sized,
    {
        self.post(endpoint::GAME_EVENT, event)
    }
}

/// Cliente real sobre `reqwest::blocking`.
#[derive(Debug, Clone)]
pub struct GameSenseClient {
    address: ServerAddress,
    http: reqwest::blocking::Client,
}

impl GameSenseClient {
    pub fn new(address: ServerAddress) -> Result<Self, ApiError> {
        Self::with_timeout(address, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(address: ServerAddress, timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::Client)?;
        Ok(Self { address, http })
    }

    pub fn address(&self) -> &ServerAddress {
        &self.address
    }
}

impl GameSenseApi for GameSenseClient {
    fn post_json(&self, path: &str, body: Vec<u8>) -> Result<(), ApiError> {
        let url = self.address.endpoint_url(path);

        let response = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .map_err(|source| ApiError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        // Corpo é só diagnóstico; se não der para ler, segue vazio
        let body = response.text().unwrap_or_default();
        Err(ApiError::Status {
            url,
            status: status.as_u16(),
            body,
        })
    }
}

/// Cria o cliente da API a partir do endereço descoberto.
pub trait Connect {
    type Api: GameSenseApi;

    fn connect(&self, address: &ServerAddress) -> Result<Self::Api, ApiError>;
}

/// Conector HTTP padrão.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpConnector;

impl Connect for HttpConnector {
    type Api = GameSenseClient;

    fn connect(&self, address: &ServerAddress) -> Result<GameSenseClient, ApiError> {
        GameSenseClient::new(address.clone())
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeGameSense;
    use chrono::NaiveDate;
    use std::net::TcpListener;

    fn client_for(server: &FakeGameSense) -> GameSenseClient {
        GameSenseClient::new(server.address()).unwrap()
    }

    #[test]
    fn posts_json_to_endpoint_path() {
        let server = FakeGameSense::start(200, "");
        let now = NaiveDate::from_ymd_opt(2021, 6, 15)
            .and_then(|d| d.and_hms_opt(9, 30, 0))
            .unwrap();

        client_for(&server)
            .game_event(&GameEvent::clock_tick(&now))
            .unwrap();

        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].path, "/game_event");
        assert_eq!(requests[0].content_type.as_deref(), Some("application/json"));
        assert_eq!(requests[0].body["data"]["frame"]["time"], "09:30");
    }

    #[test]
    fn server_error_carries_status_and_body() {
        let server = FakeGameSense::start(500, "internal error");

        let err = client_for(&server)
            .remove_game(&GameMetadata::removal())
            .unwrap_err();

        assert_eq!(err.status(), Some(500));
        let message = err.to_string();
        assert!(message.contains("500"), "mensagem: {message}");
        assert!(message.contains("internal error"), "mensagem: {message}");
    }

    #[test]
    fn any_2xx_is_success() {
        let server = FakeGameSense::start(204, "");
        assert!(
            client_for(&server)
                .game_metadata(&GameMetadata::clock())
                .is_ok()
        );
    }

    #[test]
    fn closed_port_is_transport_error() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let client = GameSenseClient::new(format!("127.0.0.1:{port}").parse().unwrap()).unwrap();

        let err = client.bind_game_event(&Binding::clock()).unwrap_err();
        assert!(matches!(err, ApiError::Transport { .. }));
        assert_eq!(err.status(), None);
    }
}
