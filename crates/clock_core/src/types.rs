//! Payloads JSON trocados com a API GameSense.
//!
//! Todos os valores (jogo, evento, zona, ícone, formatos) são constantes:
//! a cadência e a capacidade de texto do display são ditadas pelo
//! firmware, não pelo usuário.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ──────────────────────────────────────────────
// Constantes
// ──────────────────────────────────────────────

/// Identificador do "jogo" registrado no GameSense.
pub const GAME_ID: &str = "CLOCK";

/// Nome do único evento enviado.
pub const EVENT_NAME: &str = "TIME";

/// Nome exibido no painel do SteelSeries Engine.
pub const GAME_DISPLAY_NAME: &str = "Clock";

/// Desenvolvedor exibido no painel.
pub const DEVELOPER: &str = "Nyefall";

/// Formato da linha de data (`2021-06-15`).
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Formato da linha de hora (`09:30`).
pub const TIME_FORMAT: &str = "%H:%M";

/// Chaves do frame usadas pelas duas linhas do display.
pub const DATE_KEY: &str = "date";
pub const TIME_KEY: &str = "time";

const DEVICE_TYPE: &str = "screened";
const ZONE: &str = "one";
const MODE: &str = "screen";
const ICON_CLOCK: u32 = 15;

// ──────────────────────────────────────────────
// Endereço do servidor
// ──────────────────────────────────────────────

/// Endereço `host:porta` da API, como escrito no `coreProps.json`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServerAddress(String);

/// Endereço fora do formato `host:porta`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("endereço inválido {0:?} (esperado host:porta)")]
pub struct InvalidAddress(pub String);

impl ServerAddress {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// URL completa de um endpoint: `http://{address}/{path}`.
    pub fn endpoint_url(&self, path: &str) -> String {
        format!("http://{}/{}", self.0, path)
    }
}

impl FromStr for ServerAddress {
    type Err = InvalidAddress;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        let Some((host, port)) = raw.rsplit_once(':') else {
            return Err(InvalidAddress(raw.to_owned()));
        };
        if host.is_empty() || port.parse::<u16>().is_err() {
            return Err(InvalidAddress(raw.to_owned()));
        }
        Ok(Self(raw.to_owned()))
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ──────────────────────────────────────────────
// Binding (bind_game_event)
// ──────────────────────────────────────────────

/// Requisição de binding: como o evento `TIME` é desenhado na tela.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    pub game: String,
    pub event: String,
    pub value_optional: bool,
    pub handlers: Vec<BindingHandler>,
}

/// Handler de tela (um por zona de display).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BindingHandler {
    pub device_type: String,
    pub zone: String,
    pub mode: String,
    pub datas: Vec<HandlerData>,
}

/// Conteúdo de uma tela: ícone + linhas de texto.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HandlerData {
    pub icon_id: u32,
    pub lines: Vec<DisplayLine>,
}

/// Linha de texto ligada a uma chave do frame do evento.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DisplayLine {
    pub has_text: bool,
    pub bold: bool,
    pub context_frame_key: String,
}

impl DisplayLine {
    fn bold_text(key: &str) -> Self {
        Self {
            has_text: true,
            bold: true,
            context_frame_key: key.to_owned(),
        }
    }
}

impl Binding {
    /// Binding fixo do relógio: zona `one`, ícone de relógio, data + hora.
    pub fn clock() -> Self {
        Self {
            game: GAME_ID.into(),
            event: EVENT_NAME.into(),
            value_optional: true,
            handlers: vec![BindingHandler {
                device_type: DEVICE_TYPE.into(),
                zone: ZONE.into(),
                mode: MODE.into(),
                datas: vec![HandlerData {
                    icon_id: ICON_CLOCK,
                    lines: vec![
                        DisplayLine::bold_text(DATE_KEY),
                        DisplayLine::bold_text(TIME_KEY),
                    ],
                }],
            }],
        }
    }
}

// ──────────────────────────────────────────────
// Metadata (game_metadata / remove_game)
// ──────────────────────────────────────────────

/// Metadata do jogo. Na remoção só `game` é preenchido.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameMetadata {
    pub game: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub developer: Option<String>,
}

impl GameMetadata {
    /// Metadata completa enviada no registro.
    pub fn clock() -> Self {
        Self {
            game: GAME_ID.into(),
            game_display_name: Some(GAME_DISPLAY_NAME.into()),
            developer: Some(DEVELOPER.into()),
        }
    }

    /// Requisição de remoção: apenas o identificador.
    pub fn removal() -> Self {
        Self {
            game: GAME_ID.into(),
            game_display_name: None,
            developer: None,
        }
    }
}

// ──────────────────────────────────────────────
// Evento (game_event)
// ──────────────────────────────────────────────

/// Evento enviado a cada tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEvent {
    pub game: String,
    pub event: String,
    pub data: EventData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventData {
    /// O GameSense ignora eventos sem `value`; o display só usa o frame.
    pub value: i32,
    pub frame: ClockFrame,
}

/// Frame com as duas linhas já formatadas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockFrame {
    pub date: String,
    pub time: String,
}

impl ClockFrame {
    pub fn at(now: &NaiveDateTime) -> Self {
        Self {
            date: now.format(DATE_FORMAT).to_string(),
            time: now.format(TIME_FORMAT).to_string(),
        }
    }
}

impl GameEvent {
    /// Monta o evento do relógio para o instante `now` (hora local).
    pub fn clock_tick(now: &NaiveDateTime) -> Self {
        Self {
            game: GAME_ID.into(),
            event: EVENT_NAME.into(),
            data: EventData {
                value: 1,
                frame: ClockFrame::at(now),
            },
        }
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn june_15_0930() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, 6, 15)
            .and_then(|d| d.and_hms_opt(9, 30, 0))
            .unwrap()
    }

    #[test]
    fn tick_frame_uses_fixed_formats() {
        let event = GameEvent::clock_tick(&june_15_0930());
        assert_eq!(event.game, "CLOCK");
        assert_eq!(event.event, "TIME");
        assert_eq!(
            event.data.frame,
            ClockFrame {
                date: "2021-06-15".into(),
                time: "09:30".into(),
            }
        );
    }

    #[test]
    fn tick_serializes_with_value_and_frame() {
        let value = serde_json::to_value(GameEvent::clock_tick(&june_15_0930())).unwrap();
        assert_eq!(
            value,
            json!({
                "game": "CLOCK",
                "event": "TIME",
                "data": { "value": 1, "frame": { "date": "2021-06-15", "time": "09:30" } }
            })
        );
    }

    #[test]
    fn binding_uses_kebab_case_keys() {
        let value = serde_json::to_value(Binding::clock()).unwrap();
        assert_eq!(value["game"], "CLOCK");
        assert_eq!(value["event"], "TIME");
        assert_eq!(value["value_optional"], true);

        let handler = &value["handlers"][0];
        assert_eq!(handler["device-type"], "screened");
        assert_eq!(handler["zone"], "one");
        assert_eq!(handler["mode"], "screen");
        assert_eq!(handler["datas"][0]["icon-id"], 15);

        let lines = handler["datas"][0]["lines"].as_array().unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["context-frame-key"], "date");
        assert_eq!(lines[1]["context-frame-key"], "time");
        assert_eq!(lines[0]["has-text"], true);
        assert_eq!(lines[0]["bold"], true);
    }

    #[test]
    fn removal_only_carries_game_id() {
        let value = serde_json::to_value(GameMetadata::removal()).unwrap();
        assert_eq!(value, json!({ "game": "CLOCK" }));

        let full = serde_json::to_value(GameMetadata::clock()).unwrap();
        assert_eq!(full["game_display_name"], "Clock");
        assert!(full.get("developer").is_some());
    }

    #[test]
    fn server_address_parsing() {
        let addr: ServerAddress = "127.0.0.1:12345".parse().unwrap();
        assert_eq!(addr.as_str(), "127.0.0.1:12345");
        assert_eq!(addr.endpoint_url("game_event"), "http://127.0.0.1:12345/game_event");

        assert!("localhost".parse::<ServerAddress>().is_err());
        assert!(":8080".parse::<ServerAddress>().is_err());
        assert!("127.0.0.1:http".parse::<ServerAddress>().is_err());
        assert!("127.0.0.1:70000".parse::<ServerAddress>().is_err());
    }
}
