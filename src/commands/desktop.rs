//! Tauri-команды для webview: три кнопки и окно вывода.
//!
//! Каждая строка вывода уходит во фронтенд событием [`LOG_EVENT`].

use crate::config::RelayConfig;
use crate::logger::{EventSink, LogEntry};
use crate::peer::connection::RtcPeer;
use crate::session::Session;
use std::sync::Arc;
use tauri::{command, AppHandle, Emitter, Manager, Runtime, State};
use tokio::sync::{mpsc, Mutex};

pub const LOG_EVENT: &str = "pastechan-log";

/// Сессия появляется после setup, до этого команды отвечают ошибкой
#[derive(Default)]
pub struct DesktopState {
    session: Mutex<Option<Session<RtcPeer>>>,
}

struct TauriSink<R: Runtime> {
    app: AppHandle<R>,
}

impl<R: Runtime> EventSink for TauriSink<R> {
    fn append(&self, entry: LogEntry) {
        if let Err(e) = self.app.emit(LOG_EVENT, &entry) {
            log::warn!("Failed to emit {}: {:?}", LOG_EVENT, e);
        }
    }
}

/// Регистрирует команды и запускает сессию после setup приложения.
///
/// Занимает `setup` у builder, свой `setup` вместе с этим не вызывать.
pub fn attach<R: Runtime>(builder: tauri::Builder<R>, config: RelayConfig) -> tauri::Builder<R> {
    builder
        .manage(DesktopState::default())
        .invoke_handler(tauri::generate_handler![open_channel, submit_signal, send_chat])
        .setup(move |app| {
            let handle = app.handle().clone();
            tauri::async_runtime::spawn(drive(handle, config));
            Ok(())
        })
}

async fn drive<R: Runtime>(app: AppHandle<R>, config: RelayConfig) {
    let (tx, mut events) = mpsc::unbounded_channel();
    let peer = match RtcPeer::new(&config, tx).await {
        Ok(peer) => peer,
        Err(e) => {
            log::error!("Failed to create peer connection: {}", e);
            return;
        }
    };
    let sink = Arc::new(TauriSink { app: app.clone() });
    let state = app.state::<DesktopState>();
    *state.session.lock().await = Some(Session::new(peer, config, sink));

    while let Some(event) = events.recv().await {
        if let Some(session) = state.session.lock().await.as_mut() {
            session.handle_event(event).await;
        }
    }
}

#[command]
async fn open_channel(state: State<'_, DesktopState>) -> Result<(), String> {
    let mut guard = state.session.lock().await;
    let session = guard.as_mut().ok_or("peer connection is not ready")?;
    session.open_channel().await.map_err(|e| e.to_string())
}

#[command]
async fn submit_signal(state: State<'_, DesktopState>, payload: String) -> Result<(), String> {
    let guard = state.session.lock().await;
    let session = guard.as_ref().ok_or("peer connection is not ready")?;
    session.submit_signal(&payload).await.map_err(|e| e.to_string())
}

#[command]
async fn send_chat(state: State<'_, DesktopState>, message: String) -> Result<(), String> {
    let guard = state.session.lock().await;
    let session = guard.as_ref().ok_or("peer connection is not ready")?;
    session.send_chat(&message).await.map_err(|e| e.to_string())
}
