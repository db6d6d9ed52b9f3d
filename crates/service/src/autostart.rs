//! Entrada de autostart no SO: inicia `oled-clock run` no logon.
//!
//! O GameSense roda na sessão do usuário, então o relógio também:
//! - Windows: tarefa agendada `ONLOGON` (`schtasks`)
//! - macOS: agente do launchd em `~/Library/LaunchAgents`
//! - Outros Unix: unit de usuário do systemd (`systemctl --user`)
//!
//! O texto de cada entrada é gerado por funções puras, testadas em todas
//! as plataformas; só a instalação em si depende do SO.

use crate::error::{Result, ServiceError};
use clock_core::ServiceConfig;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{info, warn};

/// Como o autostart lança o relógio.
#[derive(Debug, Clone)]
pub struct Launch {
    pub exe: PathBuf,
    pub config: PathBuf,
}

impl Launch {
    fn args(&self) -> Vec<String> {
        vec![
            "run".into(),
            "--config".into(),
            self.config.display().to_string(),
        ]
    }
}

/// Executa um comando do SO e falha se o status não for sucesso.
fn run_command(program: &str, args: &[&str]) -> Result<()> {
    let command = format!("{program} {}", args.join(" "));
    info!("$ {command}");

    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| ServiceError::io(format!("executar {program}"), e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        return Err(ServiceError::Command {
            command,
            stderr: if stderr.is_empty() { stdout } else { stderr },
        });
    }
    Ok(())
}

#[cfg_attr(windows, allow(dead_code))]
fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| ServiceError::io(format!("criar {}", parent.display()), e))?;
    }
    std::fs::write(path, content)
        .map_err(|e| ServiceError::io(format!("gravar {}", path.display()), e))?;
    info!("Arquivo gravado em {}", path.display());
    Ok(())
}

#[cfg_attr(windows, allow(dead_code))]
fn remove_file(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            info!("Arquivo removido: {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ServiceError::io(format!("remover {}", path.display()), e)),
    }
}

// ──────────────────────────────────────────────
// Renderização (pura)
// ──────────────────────────────────────────────

/// Valor de `/TR` do `schtasks`: executável e argumentos entre aspas.
#[cfg_attr(not(windows), allow(dead_code))]
fn render_task_command(launch: &Launch) -> String {
    let mut parts = vec![format!("\"{}\"", launch.exe.display())];
    for arg in launch.args() {
        if arg.contains(' ') {
            parts.push(format!("\"{arg}\""));
        } else {
            parts.push(arg);
        }
    }
    parts.join(" ")
}

/// Unit `systemd --user`. `KillSignal=SIGINT` aciona o `stop` limpo.
#[cfg_attr(any(windows, target_os = "macos"), allow(dead_code))]
fn render_systemd_unit(service: &ServiceConfig, launch: &Launch) -> String {
    let mut exec = format!("\"{}\"", launch.exe.display());
    for arg in launch.args() {
        exec.push_str(&format!(" \"{arg}\""));
    }

    format!(
        "[Unit]\n\
         Description={display} – {description}\n\
         \n\
         [Service]\n\
         Type=simple\n\
         ExecStart={exec}\n\
         KillSignal=SIGINT\n\
         Restart=on-failure\n\
         RestartSec=5\n\
         \n\
         [Install]\n\
         WantedBy=default.target\n",
        display = service.display_name,
        description = service.description,
    )
}

#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
fn xml_escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Agente do launchd com `RunAtLoad`.
#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
fn render_launchd_plist(service: &ServiceConfig, launch: &Launch) -> String {
    let mut program_args = format!(
        "        <string>{}</string>\n",
        xml_escape(&launch.exe.display().to_string())
    );
    for arg in launch.args() {
        program_args.push_str(&format!("        <string>{}</string>\n", xml_escape(&arg)));
    }

    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <!DOCTYPE plist PUBLIC \"-//Apple//DTD PLIST 1.0//EN\" \"http://www.apple.com/DTDs/PropertyList-1.0.dtd\">\n\
         <plist version=\"1.0\">\n\
         <dict>\n\
         \x20   <key>Label</key>\n\
         \x20   <string>{label}</string>\n\
         \x20   <key>ProgramArguments</key>\n\
         \x20   <array>\n\
         {program_args}\
         \x20   </array>\n\
         \x20   <key>RunAtLoad</key>\n\
         \x20   <true/>\n\
         </dict>\n\
         </plist>\n",
        label = xml_escape(&service.name),
    )
}

// ──────────────────────────────────────────────
// Windows: Task Scheduler
// ──────────────────────────────────────────────

#[cfg(windows)]
pub fn install(service: &ServiceConfig, launch: &Launch) -> Result<()> {
    let task = render_task_command(launch);
    run_command(
        "schtasks",
        &[
            "/Create", "/F", "/TN", &service.name, "/SC", "ONLOGON", "/RL", "LIMITED", "/TR",
            &task,
        ],
    )?;
    run_command("schtasks", &["/Run", "/TN", &service.name])?;
    info!("Tarefa agendada \"{}\" instalada e iniciada", service.name);
    Ok(())
}

#[cfg(windows)]
pub fn uninstall(service: &ServiceConfig) -> Result<()> {
    if let Err(e) = run_command("schtasks", &["/End", "/TN", &service.name]) {
        warn!("Não foi possível parar a tarefa: {e}");
    }
    run_command("schtasks", &["/Delete", "/F", "/TN", &service.name])?;
    info!("Tarefa agendada \"{}\" removida", service.name);
    Ok(())
}

// ──────────────────────────────────────────────
// macOS: launchd
// ──────────────────────────────────────────────

#[cfg(target_os = "macos")]
fn plist_path(service: &ServiceConfig) -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or(ServiceError::Home)?;
    Ok(home
        .join("Library/LaunchAgents")
        .join(format!("{}.plist", service.name)))
}

#[cfg(target_os = "macos")]
pub fn install(service: &ServiceConfig, launch: &Launch) -> Result<()> {
    let path = plist_path(service)?;
    write_file(&path, &render_launchd_plist(service, launch))?;
    let path = path.display().to_string();
    run_command("launchctl", &["load", "-w", &path])?;
    info!("Agente launchd \"{}\" instalado", service.name);
    Ok(())
}

#[cfg(target_os = "macos")]
pub fn uninstall(service: &ServiceConfig) -> Result<()> {
    let path = plist_path(service)?;
    if let Err(e) = run_command("launchctl", &["unload", "-w", &path.display().to_string()]) {
        warn!("Não foi possível descarregar o agente: {e}");
    }
    remove_file(&path)?;
    info!("Agente launchd \"{}\" removido", service.name);
    Ok(())
}

// ──────────────────────────────────────────────
// Outros Unix: systemd --user
// ──────────────────────────────────────────────

#[cfg(not(any(windows, target_os = "macos")))]
fn unit_path(service: &ServiceConfig) -> Result<PathBuf> {
    let config = dirs::config_dir().ok_or(ServiceError::Home)?;
    Ok(config
        .join("systemd/user")
        .join(format!("{}.service", service.name)))
}

#[cfg(not(any(windows, target_os = "macos")))]
pub fn install(service: &ServiceConfig, launch: &Launch) -> Result<()> {
    let path = unit_path(service)?;
    write_file(&path, &render_systemd_unit(service, launch))?;
    let unit = format!("{}.service", service.name);
    run_command("systemctl", &["--user", "daemon-reload"])?;
    run_command("systemctl", &["--user", "enable", "--now", &unit])?;
    info!("Unit \"{unit}\" instalada e iniciada");
    Ok(())
}

#[cfg(not(any(windows, target_os = "macos")))]
pub fn uninstall(service: &ServiceConfig) -> Result<()> {
    let path = unit_path(service)?;
    let unit = format!("{}.service", service.name);
    if let Err(e) = run_command("systemctl", &["--user", "disable", "--now", &unit]) {
        warn!("Não foi possível desativar a unit: {e}");
    }
    remove_file(&path)?;
    run_command("systemctl", &["--user", "daemon-reload"])?;
    info!("Unit \"{unit}\" removida");
    Ok(())
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn launch() -> Launch {
        Launch {
            exe: PathBuf::from("/opt/oled clock/oled-clock"),
            config: PathBuf::from("/opt/oled clock/config.toml"),
        }
    }

    #[test]
    fn task_command_quotes_paths_with_spaces() {
        assert_eq!(
            render_task_command(&launch()),
            "\"/opt/oled clock/oled-clock\" run --config \"/opt/oled clock/config.toml\""
        );
    }

    #[test]
    fn systemd_unit_runs_clock_and_stops_with_sigint() {
        let unit = render_systemd_unit(&ServiceConfig::default(), &launch());
        assert!(unit.contains(
            "ExecStart=\"/opt/oled clock/oled-clock\" \"run\" \"--config\" \"/opt/oled clock/config.toml\""
        ));
        assert!(unit.contains("KillSignal=SIGINT"));
        assert!(unit.contains("WantedBy=default.target"));
        assert!(unit.starts_with("[Unit]\nDescription=SteelSeries OLED Clock"));
    }

    #[test]
    fn launchd_plist_lists_program_arguments() {
        let service = ServiceConfig {
            name: "oled.clock".into(),
            ..Default::default()
        };
        let plist = render_launchd_plist(&service, &launch());
        assert!(plist.contains("<string>oled.clock</string>"));
        assert!(plist.contains("        <string>/opt/oled clock/oled-clock</string>\n        <string>run</string>"));
        assert!(plist.contains("<key>RunAtLoad</key>"));
    }

    #[test]
    fn xml_is_escaped() {
        assert_eq!(xml_escape("a&b<c>\"d\""), "a&amp;b&lt;c&gt;&quot;d&quot;");
    }

    #[test]
    fn write_then_remove_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/unit.service");

        write_file(&path, "conteúdo").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "conteúdo");

        remove_file(&path).unwrap();
        assert!(!path.exists());
        // Remover de novo não é erro
        remove_file(&path).unwrap();
    }

    #[test]
    fn missing_program_is_io_error() {
        let err = run_command("oled-clock-comando-inexistente", &[]).unwrap_err();
        assert!(matches!(err, ServiceError::Io { .. }));
    }
}
