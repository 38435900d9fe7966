//! Текстовое представление сигнальных сообщений для ручной пересылки.
//!
//! JSON идёт как есть; компактный вариант это base64(gzip(json)).

use crate::config::RelayEncoding;
use crate::errors::RelayError;
use crate::peer::types::Signal;
use base64::{engine::general_purpose, Engine as _};
use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use serde::Serialize;
use std::io::{Read, Write};

/// Исходящий payload (description или кандидат) в текст для пересылки
pub fn encode<T: Serialize>(payload: &T, encoding: RelayEncoding) -> Result<String, RelayError> {
    let json = serde_json::to_string(payload)?;
    match encoding {
        RelayEncoding::Json => Ok(json),
        RelayEncoding::Compact => {
            let mut gz = GzEncoder::new(Vec::new(), Compression::fast());
            gz.write_all(json.as_bytes())?;
            let compressed = gz.finish()?;
            Ok(general_purpose::STANDARD.encode(compressed))
        }
    }
}

/// Вставленный текст в [`Signal`]. Сначала пробуем JSON любой формы, потом компактный вариант.
pub fn decode(text: &str) -> Result<Signal, RelayError> {
    let text = text.trim();
    let value: serde_json::Value = match serde_json::from_str(text) {
        Ok(value) => value,
        // base64 не начинается с '{' или '[', значит это битый JSON
        Err(e) if text.starts_with(['{', '[']) => return Err(e.into()),
        Err(_) => serde_json::from_slice(&inflate(text)?)?,
    };
    Signal::classify(value)
}

fn inflate(text: &str) -> Result<Vec<u8>, RelayError> {
    let compressed = general_purpose::STANDARD
        .decode(text)
        .map_err(|e| RelayError::Decode(e.to_string()))?;
    let mut json = Vec::new();
    GzDecoder::new(compressed.as_slice())
        .read_to_end(&mut json)
        .map_err(|e| RelayError::Decode(e.to_string()))?;
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peer::types::{IceCandidate, SessionDescription};

    #[test]
    fn json_is_browser_shaped() {
        let text = encode(&SessionDescription::answer("v=0\r\n"), RelayEncoding::Json).unwrap();
        assert_eq!(text, r#"{"type":"answer","sdp":"v=0\r\n"}"#);
    }

    #[test]
    fn compact_payload_is_single_line() {
        let text = encode(
            &IceCandidate::new("candidate:1 1 udp 1 10.0.0.1 9 typ host"),
            RelayEncoding::Compact,
        )
        .unwrap();
        assert!(!text.contains('\n'));
        assert!(!text.starts_with('{'));
    }

    #[test]
    fn malformed_json_is_parse_error() {
        assert!(matches!(decode("{\"type\": "), Err(RelayError::Parse(_))));
    }

    #[test]
    fn malformed_array_is_parse_error() {
        assert!(matches!(decode("[1, 2"), Err(RelayError::Parse(_))));
    }

    #[test]
    fn any_json_value_is_json() {
        for text in ["[]", "null", "42", "\"offer\"", " [1, 2, 3] "] {
            assert_eq!(decode(text).unwrap(), Signal::Unrecognized, "{}", text);
        }
    }

    #[test]
    fn garbage_is_decode_error() {
        assert!(matches!(decode("not base64 at all!"), Err(RelayError::Decode(_))));
        // валидный base64, но не gzip
        assert!(matches!(decode("aGVsbG8="), Err(RelayError::Decode(_))));
    }

    #[test]
    fn surrounding_whitespace_ignored() {
        let sig = decode("  {\"candidate\":\"c\"}\n").unwrap();
        assert_eq!(sig, Signal::Candidate(IceCandidate::new("c")));
    }
}
