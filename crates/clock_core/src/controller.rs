//! Controller do relógio – máquina de estados.
//!
//! ```text
//! Unregistered ──▶ Discovering ──▶ Idle ──▶ Running ──▶ Stopped
//!                     ▲    │                  ▲            │
//!                     └────┘ (backoff)        └────────────┘ (start)
//! ```
//!
//! Descoberta, registro, `start` e `stop` rodam na thread de quem chama.
//! Só o loop de ticks roda em uma thread própria, que seleciona entre o
//! timer periódico e o sinal de parada (canal rendezvous).

use crate::client::{ApiError, Connect, GameSenseApi, HttpConnector};
use crate::discovery::{CorePropsLocator, DiscoveryError, Locator};
use crate::types::{Binding, GameEvent, GameMetadata, ServerAddress};
use chrono::Local;
use crossbeam_channel::{Receiver, Sender, bounded, select, tick};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Período fixo entre eventos enviados ao display.
pub const TICK_PERIOD: Duration = Duration::from_secs(5);

/// Espera entre tentativas de descoberta.
pub const DISCOVERY_BACKOFF: Duration = Duration::from_secs(1);

/// A cada quantas tentativas de descoberta um aviso é registrado.
const DISCOVERY_WARN_EVERY: u64 = 60;

/// Estado do controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockState {
    /// Nenhuma operação ainda.
    Unregistered,
    /// Procurando a API (tenta de novo indefinidamente).
    Discovering,
    /// Endereço conhecido, sem timer.
    Idle,
    /// Timer armado, enviando eventos.
    Running,
    /// Timer desarmado por `stop`.
    Stopped,
}

/// Erros expostos por `start`/`stop`/`register`/`unregister`.
///
/// Falhas de descoberta não aparecem aqui: são tratadas com retry.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("falha ao criar thread do relógio: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("thread do relógio terminou com pânico")]
    TickerPanicked,
}

/// Contrato de ciclo de vida esperado por um gerenciador de serviço.
pub trait Service {
    fn start(&mut self) -> Result<(), ClockError>;
    fn stop(&mut self) -> Result<(), ClockError>;
}

/// Timer armado: sinal de parada e thread do loop existem sempre juntos.
struct Ticker {
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

impl Ticker {
    /// Bloqueia até o loop observar o sinal e terminar.
    fn halt(self) -> Result<(), ClockError> {
        // Rendezvous: `send` só retorna quando o loop recebe. Se o loop já
        // saiu, o canal está desconectado e o erro é irrelevante.
        let _ = self.stop_tx.send(());
        self.handle.join().map_err(|_| ClockError::TickerPanicked)
    }
}

/// Controller: dono do endereço descoberto e do timer.
pub struct ClockController<L = CorePropsLocator, C = HttpConnector> {
    locator: L,
    connector: C,
    address: Option<ServerAddress>,
    state: ClockState,
    ticker: Option<Ticker>,
    backoff: Duration,
    period: Duration,
}

impl ClockController {
    /// Controller de produção: `coreProps.json` fixo + cliente HTTP.
    pub fn new() -> Self {
        Self::with_parts(CorePropsLocator::default(), HttpConnector)
    }
}

impl Default for ClockController {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: Locator, C: Connect> ClockController<L, C> {
    pub fn with_parts(locator: L, connector: C) -> Self {
        Self {
            locator,
            connector,
            address: None,
            state: ClockState::Unregistered,
            ticker: None,
            backoff: DISCOVERY_BACKOFF,
            period: TICK_PERIOD,
        }
    }

    /// Troca o intervalo entre tentativas de descoberta.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    #[cfg(test)]
    fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    pub fn address(&self) -> Option<&ServerAddress> {
        self.address.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.ticker.is_some()
    }

    /// Uma única tentativa de descoberta.
    ///
    /// Com endereço já conhecido não faz nada. Em caso de falha o estado
    /// fica em [`ClockState::Discovering`].
    pub fn try_discover(&mut self) -> Result<ServerAddress, DiscoveryError> {
        if let Some(address) = &self.address {
            return Ok(address.clone());
        }

        self.state = ClockState::Discovering;
        let address = self.locator.locate()?;

        info!("API GameSense descoberta em {address}");
        self.address = Some(address.clone());
        self.state = ClockState::Idle;
        Ok(address)
    }

    /// Descobre a API, tentando de novo a cada `backoff` até conseguir.
    pub fn discover(&mut self) -> ServerAddress {
        let mut attempt: u64 = 0;
        loop {
            attempt += 1;
            match self.try_discover() {
                Ok(address) => return address,
                Err(e) if attempt == 1 => {
                    error!("{e}");
                    info!("Aguardando a API GameSense (nova tentativa a cada {:?})", self.backoff);
                }
                Err(e) if attempt % DISCOVERY_WARN_EVERY == 0 => {
                    warn!("API GameSense ainda indisponível após {attempt} tentativas: {e}");
                }
                Err(e) => debug!("Tentativa {attempt} de descoberta falhou: {e}"),
            }
            thread::sleep(self.backoff);
        }
    }

    fn connect(&mut self) -> Result<C::Api, ClockError> {
        let address = self.discover();
        Ok(self.connector.connect(&address)?)
    }

    /// Registra binding e metadata. Para no primeiro erro, sem rollback.
    pub fn register(&mut self) -> Result<(), ClockError> {
        let api = self.connect()?;

        api.bind_game_event(&Binding::clock())?;
        info!("Relógio adicionado ao GameSense");

        api.game_metadata(&GameMetadata::clock())?;
        info!("Relógio configurado");
        Ok(())
    }

    /// Remove o jogo do GameSense.
    pub fn unregister(&mut self) -> Result<(), ClockError> {
        let api = self.connect()?;

        api.remove_game(&GameMetadata::removal())?;
        info!("Relógio removido do GameSense");
        Ok(())
    }

    /// Descobre a API (se preciso) e arma o timer. Idempotente.
    pub fn start(&mut self) -> Result<(), ClockError> {
        if self.ticker.is_some() {
            debug!("Relógio já está em execução");
            return Ok(());
        }

        // Endereço gravado antes do timer existir; o loop só recebe o cliente
        let api = self.connect()?;
        let (stop_tx, stop_rx) = bounded::<()>(0);
        let period = self.period;

        let handle = thread::Builder::new()
            .name("clock-ticker".into())
            .spawn(move || tick_loop(api, period, stop_rx))
            .map_err(ClockError::Spawn)?;

        self.ticker = Some(Ticker { stop_tx, handle });
        self.state = ClockState::Running;
        info!("Relógio iniciado (intervalo {:?})", period);
        Ok(())
    }

    /// Desarma o timer e espera o loop terminar. Sem timer, não faz nada.
    pub fn stop(&mut self) -> Result<(), ClockError> {
        let Some(ticker) = self.ticker.take() else {
            debug!("Relógio não está em execução");
            return Ok(());
        };

        self.state = ClockState::Stopped;
        ticker.halt()?;
        info!("Relógio parado");
        Ok(())
    }
}

impl<L: Locator, C: Connect> Service for ClockController<L, C> {
    fn start(&mut self) -> Result<(), ClockError> {
        ClockController::<L, C>::start(self)
    }

    fn stop(&mut self) -> Result<(), ClockError> {
        ClockController::<L, C>::stop(self)
    }
}

impl<L, C> Drop for ClockController<L, C> {
    fn drop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            let _ = ticker.halt();
        }
    }
}

// ──────────────────────────────────────────────
// Loop de ticks
// ──────────────────────────────────────────────

fn tick_loop<A: GameSenseApi>(api: A, period: Duration, stop_rx: Receiver<()>) {
    let timer = tick(period);
    let mut failures: u32 = 0;

    loop {
        select! {
            recv(stop_rx) -> _ => break,
            recv(timer) -> _ => {
                // Parada pendente vence um tick que disparou ao mesmo tempo
                if stop_rx.try_recv().is_ok() {
                    break;
                }
                let event = GameEvent::clock_tick(&Local::now().naive_local());
                report_tick(api.game_event(&event), &event, &mut failures);
            }
        }
    }

    debug!("Loop de ticks encerrado");
}

/// Falhas são transitórias: registra e segue no mesmo intervalo.
fn report_tick(result: Result<(), ApiError>, event: &GameEvent, failures: &mut u32) {
    match result {
        Ok(()) => {
            if *failures > 0 {
                info!("GameSense voltou a responder após {} falha(s)", *failures);
                *failures = 0;
            }
            debug!("→ {} {}", event.data.frame.date, event.data.frame.time);
        }
        Err(e) => {
            *failures += 1;
            if *failures == 1 {
                error!("Falha ao enviar horário: {e}");
            } else {
                error!("Falha ao enviar horário ({} seguidas): {e}", *failures);
            }
        }
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
