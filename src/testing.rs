//! Утилиты для тестов: пир в памяти, который записывает каждый вызов платформы.
//!
//! `ScriptedPeer` ведёт себя как платформа настолько, насколько это нужно сессии:
//! negotiation-needed приходит один раз, на первом канале, а установка local description
//! запускает "сбор" (заданные кандидаты, потом маркер конца).

use crate::errors::RelayError;
use crate::peer::connection::{ChannelLink, PeerLink};
use crate::peer::types::{ChannelState, IceCandidate, PeerEvent, SessionDescription};
use crate::session::Session;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerCall {
    CreateDataChannel(String),
    CreateOffer,
    CreateAnswer,
    SetLocalDescription(SessionDescription),
    SetRemoteDescription(SessionDescription),
    AddIceCandidate(IceCandidate),
    Close,
}

pub struct ScriptedPeer {
    name: String,
    events: UnboundedSender<PeerEvent>,
    calls: Mutex<Vec<PeerCall>>,
    failing: Mutex<HashSet<&'static str>>,
    local_candidates: Mutex<Vec<IceCandidate>>,
    channels: Mutex<Vec<Arc<ScriptedChannel>>>,
}

impl ScriptedPeer {
    /// Новый пир и приёмный конец его очереди событий
    pub fn new(name: &str) -> (Self, UnboundedReceiver<PeerEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let peer = Self {
            name: name.to_string(),
            events,
            calls: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            local_candidates: Mutex::new(Vec::new()),
            channels: Mutex::new(Vec::new()),
        };
        (peer, rx)
    }

    /// Кандидаты, которые "находятся" после каждой установки local description
    pub fn with_local_candidates(self, candidates: Vec<IceCandidate>) -> Self {
        *lock(&self.local_candidates) = candidates;
        self
    }

    /// Операция (`createOffer`, `createAnswer`, `setLocalDescription`, `setRemoteDescription`,
    /// `addIceCandidate`, `createDataChannel`) с этого момента завершается ошибкой
    pub fn fail(&self, op: &'static str) {
        lock(&self.failing).insert(op);
    }

    pub fn calls(&self) -> Vec<PeerCall> {
        lock(&self.calls).clone()
    }

    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }

    /// Локально созданные каналы, старые первыми
    pub fn created_channels(&self) -> Vec<Arc<ScriptedChannel>> {
        lock(&self.channels).clone()
    }

    /// Канал удалённого caller приходит к этому (receiver) пиру
    pub fn deliver_incoming_channel(&self, label: &str) -> Arc<ScriptedChannel> {
        let channel = ScriptedChannel::new(label, self.events.clone());
        let _ = self
            .events
            .send(PeerEvent::IncomingChannel(channel.clone()));
        channel
    }

    fn record(&self, call: PeerCall, op: &'static str) -> Result<(), RelayError> {
        lock(&self.calls).push(call);
        if lock(&self.failing).contains(op) {
            return Err(RelayError::Platform(format!("{} rejected by {}", op, self.name)));
        }
        Ok(())
    }
}

#[async_trait]
impl PeerLink for ScriptedPeer {
    async fn create_data_channel(&self, label: &str) -> Result<Arc<dyn ChannelLink>, RelayError> {
        self.record(PeerCall::CreateDataChannel(label.to_string()), "createDataChannel")?;
        let channel = ScriptedChannel::new(label, self.events.clone());
        let first = {
            let mut channels = lock(&self.channels);
            channels.push(channel.clone());
            channels.len() == 1
        };
        if first {
            let _ = self.events.send(PeerEvent::NegotiationNeeded);
        }
        let channel: Arc<dyn ChannelLink> = channel;
        Ok(channel)
    }

    async fn create_offer(&self) -> Result<SessionDescription, RelayError> {
        self.record(PeerCall::CreateOffer, "createOffer")?;
        Ok(SessionDescription::offer(format!("v=0\r\no={} offer\r\n", self.name)))
    }

    async fn create_answer(&self) -> Result<SessionDescription, RelayError> {
        self.record(PeerCall::CreateAnswer, "createAnswer")?;
        Ok(SessionDescription::answer(format!("v=0\r\no={} answer\r\n", self.name)))
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<(), RelayError> {
        self.record(PeerCall::SetLocalDescription(desc), "setLocalDescription")?;
        for candidate in lock(&self.local_candidates).iter() {
            let _ = self
                .events
                .send(PeerEvent::IceCandidate(Some(candidate.clone())));
        }
        let _ = self.events.send(PeerEvent::IceCandidate(None));
        Ok(())
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<(), RelayError> {
        self.record(PeerCall::SetRemoteDescription(desc), "setRemoteDescription")
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), RelayError> {
        self.record(PeerCall::AddIceCandidate(candidate), "addIceCandidate")
    }

    async fn close(&self) -> Result<(), RelayError> {
        self.record(PeerCall::Close, "close")
    }
}

pub struct ScriptedChannel {
    label: String,
    state: Mutex<ChannelState>,
    sent: Mutex<Vec<String>>,
    events: UnboundedSender<PeerEvent>,
}

impl ScriptedChannel {
    fn new(label: &str, events: UnboundedSender<PeerEvent>) -> Arc<Self> {
        Arc::new(Self {
            label: label.to_string(),
            state: Mutex::new(ChannelState::Connecting),
            sent: Mutex::new(Vec::new()),
            events,
        })
    }

    /// Переход в `open` и событие open
    pub fn open(&self) {
        *lock(&self.state) = ChannelState::Open;
        let _ = self.events.send(PeerEvent::ChannelOpen {
            label: self.label.clone(),
        });
    }

    pub fn set_state(&self, state: ChannelState) {
        *lock(&self.state) = state;
    }

    /// Сообщение с той стороны
    pub fn deliver(&self, data: &str) {
        let _ = self.events.send(PeerEvent::ChannelMessage {
            label: self.label.clone(),
            data: data.to_string(),
        });
    }

    pub fn sent(&self) -> Vec<String> {
        lock(&self.sent).clone()
    }
}

#[async_trait]
impl ChannelLink for ScriptedChannel {
    fn label(&self) -> String {
        self.label.clone()
    }

    fn ready_state(&self) -> ChannelState {
        *lock(&self.state)
    }

    async fn send_text(&self, text: String) -> Result<(), RelayError> {
        let state = *lock(&self.state);
        if state != ChannelState::Open {
            return Err(RelayError::Platform(format!("InvalidStateError: {}", state)));
        }
        lock(&self.sent).push(text);
        Ok(())
    }

    async fn close(&self) -> Result<(), RelayError> {
        *lock(&self.state) = ChannelState::Closed;
        let _ = self.events.send(PeerEvent::ChannelClosed {
            label: self.label.clone(),
        });
        Ok(())
    }
}

/// Отдаёт сессии все события из очереди; возвращает, сколько обработано
pub async fn pump<P: PeerLink>(
    session: &mut Session<P>,
    events: &mut UnboundedReceiver<PeerEvent>,
) -> usize {
    let mut handled = 0;
    while let Ok(event) = events.try_recv() {
        session.handle_event(event).await;
        handled += 1;
    }
    handled
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}
