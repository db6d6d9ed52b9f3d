//! # OLED Clock
//!
//! Envia data e hora ao GameSense a cada 5 s para exibição no display
//! OLED dos dispositivos SteelSeries.
//!
//! ## Uso
//! ```bash
//! oled-clock                  # Mesmo que `run`
//! oled-clock install          # Registra no GameSense + autostart (auto-eleva para admin)
//! oled-clock uninstall        # Remove autostart + registro
//! oled-clock run --config x   # Config alternativa
//! ```

mod autostart;
mod cli;
mod error;
mod logging;

use clap::Parser;
use cli::{Cli, Command};
use clock_core::{AppConfig, ClockController, Service, CORE_PROPS_PATH};
use error::{Result, ServiceError};
use std::path::Path;
use std::process::ExitCode;
use tracing::{error, info, warn};

fn main() -> ExitCode {
    let cli = Cli::parse();
    let command = cli.command();

    // ── Config ──
    let config_path = cli.config.clone().unwrap_or_else(AppConfig::default_path);
    let (config, config_problem) = AppConfig::load(&config_path);

    // ── Logging ──
    let _log_guard = logging::init(&config.log);
    report_config(&config_path, config_problem.as_deref());

    // Salva config padrão se não existir
    if !config_path.exists() {
        if let Err(e) = config.save(&config_path) {
            warn!("Não foi possível salvar config padrão: {e}");
        }
    }

    // ── Verificar Admin (Windows) ──
    #[cfg(windows)]
    {
        if command.touches_autostart() && !cli.no_admin && !is_admin() {
            info!("Elevando privilégios para Administrador...");
            if elevate_to_admin() {
                return ExitCode::SUCCESS; // Novo processo foi lançado
            }
            warn!("Falha ao elevar privilégios. Continuando sem admin (pode falhar).");
        }
    }

    match execute(command, &config, &config_path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn execute(command: Command, config: &AppConfig, config_path: &Path) -> Result<()> {
    match command {
        Command::Run => {
            print_banner(config);
            let mut clock = ClockController::new();
            run_service(&mut clock, wait_for_shutdown)
        }
        Command::Register => Ok(ClockController::new().register()?),
        Command::Unregister => Ok(ClockController::new().unregister()?),
        Command::Install => {
            ensure_valid(config)?;
            ClockController::new().register()?;
            autostart::install(&config.service, &launch_for(config_path)?)
        }
        Command::Uninstall => {
            ensure_valid(config)?;
            // Autostart primeiro: a remoção no GameSense espera a API aparecer
            autostart::uninstall(&config.service)?;
            Ok(ClockController::new().unregister()?)
        }
    }
}

/// Roda o serviço até Ctrl-C / SIGINT.
///
/// O handler de sinal só é instalado depois do `start`: durante a
/// descoberta (que espera a API indefinidamente) Ctrl-C encerra o processo.
fn run_service(service: &mut impl Service, shutdown: impl FnOnce() -> Result<()>) -> Result<()> {
    service.start()?;
    let waited = shutdown();
    info!("Parando o relógio...");
    service.stop()?;
    waited
}

fn wait_for_shutdown() -> Result<()> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| ServiceError::io("criar runtime de sinais", e))?;

    rt.block_on(tokio::signal::ctrl_c())
        .map_err(|e| ServiceError::io("aguardar Ctrl-C", e))?;
    info!("Sinal de parada recebido");
    Ok(())
}

/// Registra como a config foi obtida (só depois do logging ativo).
fn report_config(path: &Path, problem: Option<&str>) {
    match problem {
        Some(problem) => {
            warn!("{problem}");
            warn!("Usando configuração padrão");
        }
        None if path.exists() => info!("Configuração carregada de {}", path.display()),
        None => info!("Usando configuração padrão"),
    }
}

fn ensure_valid(config: &AppConfig) -> Result<()> {
    let errors = config.validate();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ServiceError::Config(errors))
    }
}

fn launch_for(config_path: &Path) -> Result<autostart::Launch> {
    let exe = std::env::current_exe().map_err(|e| ServiceError::io("localizar executável", e))?;
    let config = std::path::absolute(config_path)
        .map_err(|e| ServiceError::io("resolver caminho da config", e))?;
    Ok(autostart::Launch { exe, config })
}

fn print_banner(config: &AppConfig) {
    println!();
    println!("══════════════════════════════════════════════");
    println!("   🕒 {} – ATIVO", config.service.display_name.to_uppercase());
    println!("══════════════════════════════════════════════");
    println!("  coreProps: {CORE_PROPS_PATH}");
    println!("  Intervalo: {}s", clock_core::controller::TICK_PERIOD.as_secs());
    println!("  Parar:     Ctrl-C");
    println!("══════════════════════════════════════════════");
    println!();
}

// ──────────────────────────────────────────────
// Windows: Verificação e elevação de admin
// ──────────────────────────────────────────────

#[cfg(windows)]
fn is_admin() -> bool {
    use windows::Win32::Foundation::HANDLE;
    use windows::Win32::Security::{GetTokenInformation, TokenElevation, TOKEN_ELEVATION, TOKEN_QUERY};
    use windows::Win32::System::Threading::{GetCurrentProcess, OpenProcessToken};

    unsafe {
        let mut token = HANDLE::default();
        if OpenProcessToken(GetCurrentProcess(), TOKEN_QUERY, &mut token).is_err() {
            return false;
        }

        let mut elevation = TOKEN_ELEVATION::default();
        let mut size = 0u32;
        let result = GetTokenInformation(
            token,
            TokenElevation,
            Some(&mut elevation as *mut _ as *mut _),
            std::mem::size_of::<TOKEN_ELEVATION>() as u32,
            &mut size,
        );

        let _ = windows::Win32::Foundation::CloseHandle(token);
        result.is_ok() && elevation.TokenIsElevated != 0
    }
}

/// Relança o executável com `runas`, repassando os mesmos argumentos.
#[cfg(windows)]
fn elevate_to_admin() -> bool {
    use std::ffi::OsStr;
    use std::os::windows::ffi::OsStrExt;
    use windows::Win32::UI::Shell::ShellExecuteW;
    use windows::core::PCWSTR;

    fn wide(s: &OsStr) -> Vec<u16> {
        s.encode_wide().chain(std::iter::once(0)).collect()
    }

    let Ok(exe) = std::env::current_exe() else {
        return false;
    };

    let params = std::env::args()
        .skip(1)
        .map(|a| if a.contains(' ') { format!("\"{a}\"") } else { a })
        .collect::<Vec<_>>()
        .join(" ");

    let exe_wide = wide(exe.as_os_str());
    let verb = wide(OsStr::new("runas"));
    let params = wide(OsStr::new(&params));

    unsafe {
        let result = ShellExecuteW(
            None,
            PCWSTR(verb.as_ptr()),
            PCWSTR(exe_wide.as_ptr()),
            PCWSTR(params.as_ptr()),
            PCWSTR::null(),
            windows::Win32::UI::WindowsAndMessaging::SW_SHOWNORMAL,
        );
        // ShellExecuteW retorna > 32 se sucesso
        result.0 as usize > 32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clock_core::ClockError;

    #[derive(Default)]
    struct CountingService {
        starts: usize,
        stops: usize,
    }

    impl Service for CountingService {
        fn start(&mut self) -> std::result::Result<(), ClockError> {
            self.starts += 1;
            Ok(())
        }

        fn stop(&mut self) -> std::result::Result<(), ClockError> {
            self.stops += 1;
            Ok(())
        }
    }

    #[test]
    fn invalid_config_blocks_autostart() {
        let mut config = AppConfig::default();
        config.service.name = String::new();
        let err = ensure_valid(&config).unwrap_err();
        assert!(matches!(err, ServiceError::Config(ref errors) if errors.len() == 1));
        assert!(err.to_string().starts_with("configuração inválida"));
    }

    #[test]
    fn default_config_is_accepted() {
        assert!(ensure_valid(&AppConfig::default()).is_ok());
    }

    #[test]
    fn launch_uses_absolute_config_path() {
        let launch = launch_for(Path::new("config.toml")).unwrap();
        assert!(launch.config.is_absolute());
        assert!(launch.config.ends_with("config.toml"));
    }

    #[test]
    fn run_service_starts_then_stops() {
        let mut service = CountingService::default();
        run_service(&mut service, || Ok(())).unwrap();
        assert_eq!((service.starts, service.stops), (1, 1));
    }

    #[test]
    fn run_service_stops_even_if_waiting_fails() {
        let mut service = CountingService::default();
        let err = run_service(&mut service, || {
            Err(ServiceError::io(
                "aguardar Ctrl-C",
                std::io::Error::other("sem sinais"),
            ))
        })
        .unwrap_err();

        assert!(matches!(err, ServiceError::Io { .. }));
        assert_eq!(service.stops, 1);
    }

    #[test]
    fn service_error_wraps_clock_error() {
        let err = ServiceError::from(ClockError::TickerPanicked);
        assert_eq!(err.to_string(), "thread do relógio terminou com pânico");
    }
}
