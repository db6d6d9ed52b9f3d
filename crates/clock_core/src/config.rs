//! Configuração do aplicativo via TOML.
//!
//! Só cobre o que é do host (nome da entrada de autostart e logging).
//! Período, formatos e caminho do `coreProps.json` são fixos no núcleo.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Identidade da entrada de autostart (tarefa agendada / agente / unit).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Nome técnico (sem espaços): nome da tarefa, label do launchd, unit
    pub name: String,
    /// Nome exibido
    pub display_name: String,
    /// Descrição
    pub description: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "SteelSeriesOLEDClock".into(),
            display_name: "SteelSeries OLED Clock".into(),
            description: "Envia data e hora ao GameSense para exibição no display OLED.".into(),
        }
    }
}

/// Configuração de logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filtro no formato `EnvFilter` (ignorado se `RUST_LOG` existir)
    pub filter: String,
    /// Grava também em arquivo com rotação diária
    pub file: bool,
    /// Diretório dos logs (vazio = `logs/` ao lado do executável)
    pub directory: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".into(),
            file: true,
            directory: String::new(),
        }
    }
}

impl LogConfig {
    /// Diretório efetivo dos arquivos de log.
    pub fn resolved_directory(&self) -> PathBuf {
        if self.directory.trim().is_empty() {
            exe_dir().join("logs")
        } else {
            PathBuf::from(&self.directory)
        }
    }
}

/// Configuração raiz do aplicativo.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceConfig,
    pub log: LogConfig,
}

impl AppConfig {
    /// Carrega configuração de um arquivo TOML.
    ///
    /// Arquivo ausente ou inválido cai no padrão. O segundo valor traz o
    /// motivo quando o arquivo existe mas não pôde ser usado; quem chama
    /// registra depois que o logging estiver ativo.
    pub fn load(path: &Path) -> (Self, Option<String>) {
        if !path.exists() {
            return (AppConfig::default(), None);
        }

        let problem = match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str::<AppConfig>(&content) {
                Ok(config) => return (config, None),
                Err(e) => format!("Erro ao parsear {}: {}", path.display(), e),
            },
            Err(e) => format!("Erro ao ler {}: {}", path.display(), e),
        };

        (AppConfig::default(), Some(problem))
    }

    /// Salva configuração em arquivo TOML.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content = toml::to_string_pretty(self).map_err(|e| e.to_string())?;
        std::fs::write(path, content).map_err(|e| e.to_string())?;
        info!("Configuração salva em {}", path.display());
        Ok(())
    }

    /// Retorna o caminho padrão do config.toml.
    pub fn default_path() -> PathBuf {
        exe_dir().join("config.toml")
    }

    /// Valida a configuração e retorna lista de erros.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        let name = &self.service.name;
        if name.is_empty() {
            errors.push("Nome do serviço não pode ser vazio".into());
        } else if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        {
            errors.push(format!(
                "Nome do serviço inválido: {name:?} (use letras, números, '-', '_' ou '.')"
            ));
        }
        if self.service.display_name.trim().is_empty() {
            errors.push("Nome de exibição do serviço não pode ser vazio".into());
        }
        if self.log.filter.trim().is_empty() {
            errors.push("Filtro de log não pode ser vazio".into());
        }

        errors
    }
}

fn exe_dir() -> PathBuf {
    std::env::current_exe()
        .map(|p| p.parent().unwrap_or(Path::new(".")).to_path_buf())
        .unwrap_or_else(|_| PathBuf::from("."))
}
