// Конфигурация приложения: ICE серверы, метка канала, формат пересылаемых сообщений.
// Файл в формате TOML, все поля необязательные.

use crate::errors::RelayError;
use crate::peer::types::{IceServerKind, ServerConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Фильтр логирования по умолчанию: в отладке подробно, в релизе только предупреждения
#[cfg(debug_assertions)]
pub const DEFAULT_LOG_FILTER: &str = "debug";

#[cfg(not(debug_assertions))]
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Переменная окружения для переопределения фильтра логирования
pub const LOG_ENV: &str = "PASTECHAN_LOG";

/// В каком виде выводить сообщения для копирования
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RelayEncoding {
    /// Обычный JSON, как у браузерного пира
    #[default]
    Json,
    /// base64(gzip(json)): короче, но не читается глазами
    Compact,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct RelayConfig {
    pub ice_servers: Vec<ServerConfig>,
    pub channel_label: String,
    pub encoding: RelayEncoding,
    pub ice_candidate_pool_size: u8,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            ice_servers: default_ice_servers(),
            channel_label: "chat".into(),
            encoding: RelayEncoding::Json,
            ice_candidate_pool_size: 0,
        }
    }
}

impl RelayConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RelayError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: RelayConfig =
            toml::from_str(&text).map_err(|e| RelayError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Валидация серверов
    pub fn validate(&self) -> Result<(), RelayError> {
        if self.channel_label.is_empty() {
            return Err(RelayError::Config("channel label cannot be empty".into()));
        }

        for server in &self.ice_servers {
            if server.url.is_empty() {
                return Err(RelayError::Config(format!(
                    "server '{}': URL cannot be empty",
                    server.id
                )));
            }

            if server.r#type == IceServerKind::Turn
                && (server.username.is_none() || server.credential.is_none())
            {
                return Err(RelayError::Config(format!(
                    "server '{}': TURN servers require username and credential",
                    server.id
                )));
            }
        }
        Ok(())
    }
}

/// Дефолтные STUN серверы
pub fn default_ice_servers() -> Vec<ServerConfig> {
    vec![
        ServerConfig {
            id: "default-stun".into(),
            r#type: IceServerKind::Stun,
            url: "stun:stun.l.google.com:19302".into(),
            username: None,
            credential: None,
        },
        ServerConfig {
            id: "default-stun-1".into(),
            r#type: IceServerKind::Stun,
            url: "stun:stun1.l.google.com:19302".into(),
            username: None,
            credential: None,
        },
    ]
}
