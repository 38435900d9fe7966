//! Сигнализация через копирование для WebRTC data channel.
//!
//! Два экземпляра обмениваются offer, answer и ICE кандидатами через человека, который копирует
//! выведенный текст с одной стороны и вставляет на другой. После согласования сообщения чата идут
//! напрямую по каналу.
//!
//! [`Session`] ведёт весь процесс; [`peer::RtcPeer`] связывает её с крейтом `webrtc`,
//! [`testing::ScriptedPeer`] со скриптом в памяти.

pub mod commands;
pub mod config;
pub mod errors;
pub mod logger;
pub mod peer;
pub mod session;
pub mod signaling;
pub mod testing;
pub mod utils;

pub use config::{RelayConfig, RelayEncoding};
pub use errors::RelayError;
pub use logger::{EventSink, LogEntry, LogKind, MemorySink, OutputLog};
pub use session::Session;
