//! # Clock Core
//!
//! Núcleo do relógio OLED: localiza a API GameSense, registra o "jogo"
//! `CLOCK` e envia data/hora em intervalo fixo até ser parado.
//!
//! ## Módulos
//! - [`types`] – Payloads JSON do GameSense e constantes fixas
//! - [`discovery`] – Leitura do `coreProps.json` + probe TCP do endereço
//! - [`client`] – POST JSON com timeout e erro uniforme
//! - [`controller`] – Máquina de estados (descoberta, registro, ticks)
//! - [`config`] – Configuração do aplicativo via TOML

pub mod client;
pub mod config;
pub mod controller;
pub mod discovery;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

// Re-exports convenientes
pub use client::{ApiError, Connect, GameSenseApi, GameSenseClient, HttpConnector};
pub use config::{AppConfig, LogConfig, ServiceConfig};
pub use controller::{ClockController, ClockError, ClockState, Service};
pub use discovery::{CorePropsLocator, DiscoveryError, Locator, CORE_PROPS_PATH};
pub use types::{Binding, GameEvent, GameMetadata, ServerAddress};
