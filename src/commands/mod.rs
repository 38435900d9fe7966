//! Оболочки вокруг сессии: терминал и (с фичей `desktop`) Tauri.

#[cfg(feature = "desktop")]
pub mod desktop;
pub mod terminal;
