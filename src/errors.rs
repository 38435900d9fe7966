use thiserror::Error;

use crate::peer::types::ChannelState;

/// Всё, что может сломаться между действием пользователя и платформой.
///
/// Ни одна ошибка не фатальна: сессия остаётся рабочей.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Платформа отклонила операцию (offer, answer, description, кандидат, отправка)
    #[error("{0}")]
    Platform(String),

    /// Вставленный текст не JSON, или у узнанной формы поля не того типа
    #[error("malformed signaling payload: {0}")]
    Parse(#[from] serde_json::Error),

    /// Текст не JSON и не валидный компактный payload (base64 + gzip)
    #[error("malformed compact payload: {0}")]
    Decode(String),

    #[error("channel is undefined")]
    ChannelUndefined,

    #[error("channel.readyState == {0}")]
    ChannelNotOpen(ChannelState),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl RelayError {
    pub fn platform(err: impl std::fmt::Display) -> Self {
        RelayError::Platform(err.to_string())
    }
}

impl From<webrtc::Error> for RelayError {
    fn from(err: webrtc::Error) -> Self {
        RelayError::platform(err)
    }
}
