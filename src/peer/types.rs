use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::errors::RelayError;
use crate::peer::connection::ChannelLink;

/// Тип session description, который вообще имеет смысл пересылать вручную
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SdpKind {
    Offer,
    Answer,
}

impl fmt::Display for SdpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SdpKind::Offer => write!(f, "offer"),
            SdpKind::Answer => write!(f, "answer"),
        }
    }
}

/// Offer или answer в той же форме, что отдаёт браузерный `JSON.stringify(desc)`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub kind: SdpKind,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Answer,
            sdp: sdp.into(),
        }
    }
}

/// ICE кандидат для WebRTC соединения
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(rename = "sdpMid", default)]
    pub sdp_mid: Option<String>,
    #[serde(rename = "sdpMLineIndex", default)]
    pub sdp_mline_index: Option<u16>,
    #[serde(rename = "usernameFragment", default)]
    pub username_fragment: Option<String>,
}

impl IceCandidate {
    pub fn new(candidate: impl Into<String>) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_mid: None,
            sdp_mline_index: None,
            username_fragment: None,
        }
    }
}

/// Разобранный сигнальный payload, тип определяется по форме
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    Offer(SessionDescription),
    Answer(SessionDescription),
    Candidate(IceCandidate),
    Unrecognized,
}

impl Signal {
    /// offer и answer требуют непустой `sdp`, кандидат требует непустой `candidate`.
    /// Всё остальное, включая не-объекты, это `Unrecognized`
    pub fn classify(value: Value) -> Result<Signal, RelayError> {
        let has_sdp = non_empty_str(&value, "sdp");
        match value.get("type").and_then(Value::as_str) {
            Some("offer") if has_sdp => return Ok(Signal::Offer(serde_json::from_value(value)?)),
            Some("answer") if has_sdp => {
                return Ok(Signal::Answer(serde_json::from_value(value)?))
            }
            _ => {}
        }
        if non_empty_str(&value, "candidate") {
            return Ok(Signal::Candidate(serde_json::from_value(value)?));
        }
        Ok(Signal::Unrecognized)
    }
}

fn non_empty_str(value: &Value, key: &str) -> bool {
    value
        .get(key)
        .and_then(Value::as_str)
        .is_some_and(|s| !s.is_empty())
}

/// `readyState` канала
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChannelState {
    Connecting,
    Open,
    Closing,
    Closed,
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChannelState::Connecting => "connecting",
            ChannelState::Open => "open",
            ChannelState::Closing => "closing",
            ChannelState::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// События платформы; колбэки только кладут их в очередь, сессия разбирает по одному
pub enum PeerEvent {
    NegotiationNeeded,
    /// `None` означает конец сбора кандидатов
    IceCandidate(Option<IceCandidate>),
    IncomingChannel(Arc<dyn ChannelLink>),
    ChannelOpen { label: String },
    ChannelMessage { label: String, data: String },
    ChannelClosed { label: String },
}

impl fmt::Debug for PeerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeerEvent::NegotiationNeeded => write!(f, "NegotiationNeeded"),
            PeerEvent::IceCandidate(c) => write!(f, "IceCandidate({:?})", c),
            PeerEvent::IncomingChannel(ch) => write!(f, "IncomingChannel({})", ch.label()),
            PeerEvent::ChannelOpen { label } => write!(f, "ChannelOpen({})", label),
            PeerEvent::ChannelMessage { label, data } => {
                write!(f, "ChannelMessage({}, {} bytes)", label, data.len())
            }
            PeerEvent::ChannelClosed { label } => write!(f, "ChannelClosed({})", label),
        }
    }
}

/// Тип ICE сервера
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IceServerKind {
    Stun,
    Turn,
}

/// Конфигурация ICE сервера
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub id: String,
    pub r#type: IceServerKind,
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub credential: Option<String>,
}
