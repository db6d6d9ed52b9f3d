//! Inicialização do `tracing`: console + arquivo diário opcional.

use clock_core::LogConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Nome base do arquivo de log (`oled-clock.log.AAAA-MM-DD`).
const LOG_FILE_PREFIX: &str = "oled-clock.log";

/// Mantém o writer de arquivo vivo; soltar o guard descarrega o buffer.
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

/// `RUST_LOG` tem prioridade; senão usa o filtro da config.
fn build_filter(log: &LogConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&log.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

pub fn init(log: &LogConfig) -> LogGuard {
    let mut warn_msg = None;
    let mut file_guard = None;
    let mut file_layer = None;

    if log.file {
        let dir = log.resolved_directory();
        match std::fs::create_dir_all(&dir) {
            Ok(()) => {
                let appender = tracing_appender::rolling::daily(&dir, LOG_FILE_PREFIX);
                let (writer, guard) = tracing_appender::non_blocking(appender);
                file_guard = Some(guard);
                file_layer = Some(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(writer),
                );
            }
            Err(e) => {
                warn_msg = Some(format!(
                    "Log em arquivo desativado ({}): {e}",
                    dir.display()
                ));
            }
        }
    }

    tracing_subscriber::registry()
        .with(build_filter(log))
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .try_init()
        .ok();

    if let Some(message) = warn_msg {
        tracing::warn!("{message}");
    }

    LogGuard { _file: file_guard }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_filter_falls_back_to_info() {
        let log = LogConfig {
            filter: "clock_core=barulhento".into(),
            ..Default::default()
        };
        // Sem RUST_LOG no ambiente de teste o filtro da config é usado
        if std::env::var_os("RUST_LOG").is_none() {
            assert_eq!(build_filter(&log).to_string(), "info");
        }
    }

    #[test]
    fn config_filter_is_used() {
        let log = LogConfig {
            filter: "clock_core=debug".into(),
            ..Default::default()
        };
        if std::env::var_os("RUST_LOG").is_none() {
            assert_eq!(build_filter(&log).to_string(), "clock_core=debug");
        }
    }
}
