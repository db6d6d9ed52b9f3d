//! Linha de comando.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// OLED Clock – data e hora no display OLED via GameSense
#[derive(Parser, Debug, Clone)]
#[command(name = "oled-clock", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Arquivo de configuração (padrão: config.toml ao lado do executável)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Não pedir elevação de privilégios (Windows)
    #[arg(long, global = true)]
    pub no_admin: bool,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Envia data/hora ao GameSense até receber Ctrl-C (padrão)
    Run,
    /// Registra no GameSense e cria a entrada de autostart
    Install,
    /// Remove a entrada de autostart e o registro no GameSense
    Uninstall,
    /// Apenas registra binding e metadata no GameSense
    Register,
    /// Apenas remove o jogo do GameSense
    Unregister,
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.unwrap_or(Command::Run)
    }
}

impl Command {
    /// Mexe na entrada de autostart do SO.
    #[cfg_attr(not(windows), allow(dead_code))]
    pub fn touches_autostart(self) -> bool {
        matches!(self, Command::Install | Command::Uninstall)
    }
}
