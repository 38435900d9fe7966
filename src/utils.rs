use crate::peer::types::{IceServerKind, ServerConfig};
use rand::Rng;

pub fn random_id() -> String {
    hex::encode(rand::rng().random::<[u8; 8]>())
}

// Функция для добавления схемы протокола к URL ICE сервера, если она отсутствует
pub fn add_ice_url_scheme(config: &ServerConfig) -> String {
    // Если url уже начинается с "turn:"/"turns:" или "stun:"/"stuns:", возвращаем как есть
    let has_scheme = ["turn:", "turns:", "stun:", "stuns:"]
        .iter()
        .any(|scheme| config.url.starts_with(scheme));
    if has_scheme {
        config.url.clone()
    } else {
        // В зависимости от типа сервера добавляем нужную схему
        let scheme = match config.r#type {
            IceServerKind::Turn => "turn:",
            IceServerKind::Stun => "stun:",
        };
        format!("{}{}", scheme, config.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server(kind: IceServerKind, url: &str) -> ServerConfig {
        ServerConfig {
            id: "t".into(),
            r#type: kind,
            url: url.into(),
            username: None,
            credential: None,
        }
    }

    #[test]
    fn scheme_added_by_kind() {
        assert_eq!(
            add_ice_url_scheme(&server(IceServerKind::Stun, "stun.example.org:3478")),
            "stun:stun.example.org:3478"
        );
        assert_eq!(
            add_ice_url_scheme(&server(IceServerKind::Turn, "turn.example.org")),
            "turn:turn.example.org"
        );
    }

    #[test]
    fn existing_scheme_kept() {
        assert_eq!(
            add_ice_url_scheme(&server(IceServerKind::Turn, "turns:relay.example.org:5349")),
            "turns:relay.example.org:5349"
        );
    }

    #[test]
    fn random_id_is_hex() {
        let id = random_id();
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
