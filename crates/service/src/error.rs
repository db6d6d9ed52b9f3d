//! Erros do binário (camada de serviço do SO).

use clock_core::ClockError;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Clock(#[from] ClockError),

    #[error("configuração inválida: {}", .0.join("; "))]
    Config(Vec<String>),

    #[error("erro de E/S ao {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },

    #[error("comando `{command}` falhou: {stderr}")]
    Command { command: String, stderr: String },

    #[error("diretório home do usuário não encontrado")]
    Home,
}

impl ServiceError {
    pub fn io(operation: impl Into<String>, source: io::Error) -> Self {
        ServiceError::Io {
            operation: operation.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
