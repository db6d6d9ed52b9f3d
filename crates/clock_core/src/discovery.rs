//! Descoberta da API GameSense.
//!
//! O SteelSeries Engine escreve o endereço atual da API em `coreProps.json`
//! a cada inicialização. O arquivo pode sobrar de uma sessão anterior, então
//! o endereço só é aceito depois de um probe TCP bem-sucedido.

use crate::types::{InvalidAddress, ServerAddress};
use serde::Deserialize;
use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Caminho fixo do `coreProps.json` (por plataforma).
#[cfg(windows)]
pub const CORE_PROPS_PATH: &str =
    r"C:\ProgramData\SteelSeries\SteelSeries Engine 3\coreProps.json";

#[cfg(target_os = "macos")]
pub const CORE_PROPS_PATH: &str =
    "/Library/Application Support/SteelSeries Engine 3/coreProps.json";

#[cfg(not(any(windows, target_os = "macos")))]
pub const CORE_PROPS_PATH: &str = "coreProps.json";

/// Timeout do probe TCP.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Erros da fase de descoberta. Nunca fatais: o controller tenta de novo.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("falha ao ler configuração do GameSense {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("configuração do GameSense inválida {}: {reason}", path.display())]
    ConfigParse { path: PathBuf, reason: String },

    #[error("API GameSense inacessível em {address}: {source}")]
    AddressUnreachable {
        address: ServerAddress,
        #[source]
        source: io::Error,
    },
}

/// Formato mínimo do `coreProps.json`; demais campos são ignorados.
#[derive(Debug, Deserialize)]
struct CoreProps {
    address: String,
}

/// Lê o `coreProps.json` e extrai o endereço. Sem probe.
pub fn read_server_address(path: &Path) -> Result<ServerAddress, DiscoveryError> {
    let content = std::fs::read(path).map_err(|source| DiscoveryError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;

    let props: CoreProps =
        serde_json::from_slice(&content).map_err(|e| DiscoveryError::ConfigParse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    props
        .address
        .parse()
        .map_err(|e: InvalidAddress| DiscoveryError::ConfigParse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

/// Endereços candidatos para o probe.
///
/// O `coreProps.json` traz IP literal; o resolvedor do sistema (sem timeout)
/// só é usado quando o host é um nome.
fn socket_addrs(address: &ServerAddress) -> io::Result<Vec<SocketAddr>> {
    match address.as_str().parse::<SocketAddr>() {
        Ok(addr) => Ok(vec![addr]),
        Err(_) => Ok(address.as_str().to_socket_addrs()?.collect()),
    }
}

/// Abre e fecha imediatamente uma conexão TCP com `address`.
pub fn probe_address(address: &ServerAddress, timeout: Duration) -> Result<(), DiscoveryError> {
    let unreachable = |source: io::Error| DiscoveryError::AddressUnreachable {
        address: address.clone(),
        source,
    };

    let candidates = socket_addrs(address).map_err(unreachable)?;

    let mut last_err = io::Error::new(io::ErrorKind::NotFound, "nenhum endereço resolvido");
    for candidate in candidates {
        match TcpStream::connect_timeout(&candidate, timeout) {
            Ok(stream) => {
                drop(stream);
                debug!("Probe OK em {candidate}");
                return Ok(());
            }
            Err(e) => {
                debug!("Probe falhou em {candidate}: {e}");
                last_err = e;
            }
        }
    }

    Err(unreachable(last_err))
}

/// Fonte do endereço da API. Uma chamada = uma tentativa de descoberta.
pub trait Locator {
    fn locate(&self) -> Result<ServerAddress, DiscoveryError>;
}

/// Descoberta real: `coreProps.json` + probe TCP.
#[derive(Debug, Clone)]
pub struct CorePropsLocator {
    path: PathBuf,
    probe_timeout: Duration,
}

impl CorePropsLocator {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            probe_timeout: PROBE_TIMEOUT,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for CorePropsLocator {
    fn default() -> Self {
        Self::at(CORE_PROPS_PATH)
    }
}

impl Locator for CorePropsLocator {
    fn locate(&self) -> Result<ServerAddress, DiscoveryError> {
        let address = read_server_address(&self.path)?;
        probe_address(&address, self.probe_timeout)?;
        Ok(address)
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
