//! Сессия: одно соединение, максимум один канал, ручная пересылка сигналов.
//!
//! Все входы (действия пользователя и события платформы) обрабатываются по одному,
//! владелец сессии решает, в каком порядке их подавать.

use crate::config::RelayConfig;
use crate::errors::RelayError;
use crate::logger::{EventSink, OutputLog};
use crate::peer::connection::{ChannelLink, PeerLink};
use crate::peer::types::{ChannelState, IceCandidate, PeerEvent, SessionDescription, Signal};
use crate::signaling;
use crate::utils::random_id;
use serde::Serialize;
use std::sync::Arc;

pub struct Session<P: PeerLink> {
    id: String,
    peer: P,
    channel: Option<Arc<dyn ChannelLink>>,
    config: RelayConfig,
    out: OutputLog,
}

impl<P: PeerLink> Session<P> {
    pub fn new(peer: P, config: RelayConfig, sink: Arc<dyn EventSink>) -> Self {
        let id = random_id();
        log::debug!("Session {} created, channel label '{}'", id, config.channel_label);
        Self {
            id,
            peer,
            channel: None,
            config,
            out: OutputLog::new(sink),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn peer(&self) -> &P {
        &self.peer
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn channel(&self) -> Option<&Arc<dyn ChannelLink>> {
        self.channel.as_ref()
    }

    /// `None` пока канала нет
    pub fn channel_state(&self) -> Option<ChannelState> {
        self.channel.as_ref().map(|ch| ch.ready_state())
    }

    /// Шаг 1 (caller): создаём канал, платформа ответит negotiation-needed
    pub async fn open_channel(&mut self) -> Result<(), RelayError> {
        log::debug!("[{}] open_channel '{}'", self.id, self.config.channel_label);
        let channel = self
            .peer
            .create_data_channel(&self.config.channel_label)
            .await
            .map_err(|e| self.report("createDataChannel", e))?;
        if self.channel.replace(channel).is_some() {
            log::debug!("[{}] previous channel reference dropped", self.id);
        }
        Ok(())
    }

    /// Шаг 3 (caller): offer -> local description -> в вывод для пересылки
    pub async fn on_negotiation_needed(&self) -> Result<(), RelayError> {
        let offer = self
            .peer
            .create_offer()
            .await
            .map_err(|e| self.report("createOffer", e))?;
        self.peer
            .set_local_description(offer.clone())
            .await
            .map_err(|e| self.report("setLocalDescription", e))?;
        self.relay("Send this offer to the peer:", &offer)
    }

    pub fn on_ice_candidate(&self, candidate: Option<IceCandidate>) -> Result<(), RelayError> {
        match candidate {
            Some(candidate) => self.relay("Send this ice candidate to the peer:", &candidate),
            None => {
                log::debug!("[{}] end of local candidates", self.id);
                Ok(())
            }
        }
    }

    /// Текст, вставленный пользователем. Битый текст только выводится как ошибка, состояние не меняется
    pub async fn submit_signal(&self, text: &str) -> Result<(), RelayError> {
        let signal = signaling::decode(text).map_err(|e| self.report("signal button", e))?;

        match signal {
            Signal::Offer(offer) => self.accept_offer(offer).await,
            Signal::Answer(answer) => {
                self.peer
                    .set_remote_description(answer)
                    .await
                    .map_err(|e| self.report("setRemoteDescription from answer", e))?;
                self.out.success("setRemoteDescription from answer");
                Ok(())
            }
            Signal::Candidate(candidate) => {
                self.peer
                    .add_ice_candidate(candidate)
                    .await
                    .map_err(|e| self.report("addIceCandidate", e))?;
                self.out.success("addIceCandidate");
                Ok(())
            }
            Signal::Unrecognized => {
                log::debug!("[{}] unrecognized payload: {}", self.id, text.trim());
                self.out.message("Ignored unrecognized signaling payload");
                Ok(())
            }
        }
    }

    /// Шаг 2 (receiver): remote description -> answer -> local description
    async fn accept_offer(&self, offer: SessionDescription) -> Result<(), RelayError> {
        self.peer
            .set_remote_description(offer)
            .await
            .map_err(|e| self.report("setRemoteDescription from offer", e))?;
        self.out.success("setRemoteDescription from offer");

        let answer = self
            .peer
            .create_answer()
            .await
            .map_err(|e| self.report("createAnswer", e))?;
        self.peer
            .set_local_description(answer.clone())
            .await
            .map_err(|e| self.report("setLocalDescription", e))?;
        self.relay("Send this answer to the peer:", &answer)
    }

    /// Receiver: канал от caller пришёл к нам
    pub fn on_incoming_channel(&mut self, channel: Arc<dyn ChannelLink>) {
        log::info!("[{}] incoming channel '{}'", self.id, channel.label());
        self.channel = Some(channel);
    }

    pub async fn send_chat(&self, message: &str) -> Result<(), RelayError> {
        let channel = self
            .channel
            .as_ref()
            .ok_or(RelayError::ChannelUndefined)
            .map_err(|e| self.report("chat button", e))?;

        let state = channel.ready_state();
        if state != ChannelState::Open {
            return Err(self.report("chat button", RelayError::ChannelNotOpen(state)));
        }

        channel
            .send_text(message.to_string())
            .await
            .map_err(|e| self.report("send", e))
    }

    /// Разбор одного события платформы. Ошибки уже выведены пользователю.
    pub async fn handle_event(&mut self, event: PeerEvent) {
        log::trace!("[{}] event {:?}", self.id, event);
        match event {
            PeerEvent::NegotiationNeeded => {
                let _ = self.on_negotiation_needed().await;
            }
            PeerEvent::IceCandidate(candidate) => {
                let _ = self.on_ice_candidate(candidate);
            }
            PeerEvent::IncomingChannel(channel) => self.on_incoming_channel(channel),
            PeerEvent::ChannelOpen { .. } => self.out.success("channel onopen"),
            PeerEvent::ChannelMessage { data, .. } => {
                self.out.message(&format!("message from the channel: {}", data))
            }
            PeerEvent::ChannelClosed { label } => {
                if self.current_channel_closed(&label) {
                    log::info!("[{}] channel '{}' closed", self.id, label);
                    self.out.message("channel closed");
                } else {
                    log::debug!("[{}] close of non-current channel '{}' ignored", self.id, label);
                }
            }
        }
    }

    /// Ручное разъединение: закрываем канал и соединение
    pub async fn close(&mut self) {
        if let Some(channel) = self.channel.take() {
            if let Err(e) = channel.close().await {
                log::warn!("[{}] closing channel: {}", self.id, e);
            }
        }
        if let Err(e) = self.peer.close().await {
            log::warn!("[{}] closing peer connection: {}", self.id, e);
        }
        log::info!("[{}] session closed", self.id);
    }

    /// Событие закрытия относится к текущему каналу, только если он сам уже закрыт:
    /// замещённый канал с той же меткой не трогает состояние текущего
    fn current_channel_closed(&self, label: &str) -> bool {
        self.channel.as_ref().is_some_and(|ch| {
            ch.label() == label
                && matches!(ch.ready_state(), ChannelState::Closing | ChannelState::Closed)
        })
    }

    fn relay<T: Serialize>(&self, msg: &str, payload: &T) -> Result<(), RelayError> {
        let text = signaling::encode(payload, self.config.encoding)
            .map_err(|e| self.report("render payload", e))?;
        self.out.relay(msg, text);
        Ok(())
    }

    fn report(&self, op: &str, err: RelayError) -> RelayError {
        self.out.failure(op, &err);
        err
    }
}
