use crate::config::RelayConfig;
use crate::errors::RelayError;
use crate::peer::types::{ChannelState, IceCandidate, PeerEvent, SdpKind, ServerConfig, SessionDescription};
use crate::utils::add_ice_url_scheme;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::data_channel::data_channel_state::RTCDataChannelState;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::peer_connection::policy::bundle_policy::RTCBundlePolicy;
use webrtc::peer_connection::policy::rtcp_mux_policy::RTCRtcpMuxPolicy;
use webrtc::{
    api::APIBuilder,
    data_channel::{data_channel_init::RTCDataChannelInit, RTCDataChannel},
    ice_transport::ice_server::RTCIceServer,
    peer_connection::{
        configuration::RTCConfiguration, peer_connection_state::RTCPeerConnectionState,
        sdp::session_description::RTCSessionDescription, RTCPeerConnection,
    },
};

/// Канал сообщений, которым владеет сессия (созданный локально или пришедший от пира)
#[async_trait]
pub trait ChannelLink: Send + Sync {
    fn label(&self) -> String;

    fn ready_state(&self) -> ChannelState;

    /// Отправляет `text` как есть: без фрейминга, без разбиения, без подтверждений
    async fn send_text(&self, text: String) -> Result<(), RelayError>;

    async fn close(&self) -> Result<(), RelayError>;
}

/// Соединение с точки зрения сессии.
///
/// Асинхронные события (negotiation-needed, локальные кандидаты, входящий канал,
/// open/message/close канала) реализация кладёт в очередь [`PeerEvent`], в сессию напрямую не зовёт.
#[async_trait]
pub trait PeerLink: Send + Sync {
    async fn create_data_channel(&self, label: &str) -> Result<Arc<dyn ChannelLink>, RelayError>;

    async fn create_offer(&self) -> Result<SessionDescription, RelayError>;

    async fn create_answer(&self) -> Result<SessionDescription, RelayError>;

    async fn set_local_description(&self, desc: SessionDescription) -> Result<(), RelayError>;

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<(), RelayError>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), RelayError>;

    async fn close(&self) -> Result<(), RelayError>;
}

/// `PeerLink` поверх `webrtc::RTCPeerConnection`
pub struct RtcPeer {
    pc: Arc<RTCPeerConnection>,
    events: UnboundedSender<PeerEvent>,
}

impl RtcPeer {
    /// создаём Peer и вешаем обработчики, которые только пересылают события в очередь
    pub async fn new(
        config: &RelayConfig,
        events: UnboundedSender<PeerEvent>,
    ) -> Result<Self, RelayError> {
        let api = APIBuilder::new().build();
        let pc = Arc::new(api.new_peer_connection(rtc_config(config)).await?);

        pc.on_negotiation_needed(Box::new({
            let tx = events.clone();
            move || {
                log::debug!("Negotiation needed");
                let _ = tx.send(PeerEvent::NegotiationNeeded);
                Box::pin(async {})
            }
        }));

        pc.on_ice_candidate(Box::new({
            let tx = events.clone();
            move |cand: Option<RTCIceCandidate>| {
                match cand {
                    Some(c) => match c.to_json() {
                        Ok(init) => {
                            log::debug!(
                                "Trickle LOCAL: candidate={} sdp_mid={:?} sdp_mline_index={:?}",
                                init.candidate,
                                init.sdp_mid,
                                init.sdp_mline_index
                            );
                            let _ = tx.send(PeerEvent::IceCandidate(Some(IceCandidate {
                                candidate: init.candidate,
                                sdp_mid: init.sdp_mid,
                                sdp_mline_index: init.sdp_mline_index,
                                username_fragment: init.username_fragment,
                            })));
                        }
                        Err(e) => log::warn!("Failed to serialize local candidate: {}", e),
                    },
                    None => {
                        // cand == None означает конец сбора
                        log::debug!("ICE candidate gathering completed (null candidate received)");
                        let _ = tx.send(PeerEvent::IceCandidate(None));
                    }
                }
                Box::pin(async {})
            }
        }));

        pc.on_ice_gathering_state_change(Box::new(move |state| {
            log::debug!("ICE gathering state changed to: {:?}", state);
            Box::pin(async {})
        }));

        pc.on_peer_connection_state_change(Box::new(move |st: RTCPeerConnectionState| {
            match st {
                RTCPeerConnectionState::Failed | RTCPeerConnectionState::Disconnected => {
                    log::warn!("Peer connection state changed to: {:?}", st)
                }
                _ => log::info!("Peer connection state changed to: {:?}", st),
            }
            Box::pin(async {})
        }));

        pc.on_data_channel(Box::new({
            let tx = events.clone();
            move |dc: Arc<RTCDataChannel>| {
                log::info!("Incoming data channel '{}'", dc.label());
                let channel: Arc<dyn ChannelLink> = RtcChannel::attach(dc, tx.clone());
                let _ = tx.send(PeerEvent::IncomingChannel(channel));
                Box::pin(async {})
            }
        }));

        Ok(Self { pc, events })
    }
}

#[async_trait]
impl PeerLink for RtcPeer {
    async fn create_data_channel(&self, label: &str) -> Result<Arc<dyn ChannelLink>, RelayError> {
        let dc = self
            .pc
            .create_data_channel(label, Some(RTCDataChannelInit::default()))
            .await?;
        let channel: Arc<dyn ChannelLink> = RtcChannel::attach(dc, self.events.clone());
        Ok(channel)
    }

    async fn create_offer(&self) -> Result<SessionDescription, RelayError> {
        let offer = self.pc.create_offer(None).await?;
        Ok(SessionDescription::offer(offer.sdp))
    }

    async fn create_answer(&self) -> Result<SessionDescription, RelayError> {
        let answer = self.pc.create_answer(None).await?;
        Ok(SessionDescription::answer(answer.sdp))
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<(), RelayError> {
        self.pc.set_local_description(to_rtc(desc)?).await?;
        Ok(())
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<(), RelayError> {
        self.pc.set_remote_description(to_rtc(desc)?).await?;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), RelayError> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_mline_index,
            username_fragment: candidate.username_fragment,
        };
        self.pc.add_ice_candidate(init).await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), RelayError> {
        self.pc.close().await?;
        Ok(())
    }
}

fn to_rtc(desc: SessionDescription) -> Result<RTCSessionDescription, RelayError> {
    let rtc = match desc.kind {
        SdpKind::Offer => RTCSessionDescription::offer(desc.sdp)?,
        SdpKind::Answer => RTCSessionDescription::answer(desc.sdp)?,
    };
    Ok(rtc)
}

/// `ChannelLink` поверх `RTCDataChannel`
pub struct RtcChannel {
    dc: Arc<RTCDataChannel>,
    label: String,
}

impl RtcChannel {
    /// общий обработчик data-channel: open/message/close уходят в очередь событий
    fn attach(dc: Arc<RTCDataChannel>, events: UnboundedSender<PeerEvent>) -> Arc<Self> {
        let label = dc.label().to_string();

        dc.on_open(Box::new({
            let tx = events.clone();
            let label = label.clone();
            move || {
                log::info!("Data channel '{}' opened", label);
                let _ = tx.send(PeerEvent::ChannelOpen { label });
                Box::pin(async {})
            }
        }));

        dc.on_message(Box::new({
            let tx = events.clone();
            let label = label.clone();
            move |msg: DataChannelMessage| {
                log::debug!("Received message, length: {}", msg.data.len());
                let data = String::from_utf8_lossy(&msg.data).into_owned();
                let _ = tx.send(PeerEvent::ChannelMessage {
                    label: label.clone(),
                    data,
                });
                Box::pin(async {})
            }
        }));

        dc.on_close(Box::new({
            let label = label.clone();
            move || {
                log::info!("Data channel '{}' closed", label);
                let _ = events.send(PeerEvent::ChannelClosed {
                    label: label.clone(),
                });
                Box::pin(async {})
            }
        }));

        Arc::new(Self { dc, label })
    }
}

#[async_trait]
impl ChannelLink for RtcChannel {
    fn label(&self) -> String {
        self.label.clone()
    }

    fn ready_state(&self) -> ChannelState {
        match self.dc.ready_state() {
            RTCDataChannelState::Open => ChannelState::Open,
            RTCDataChannelState::Closing => ChannelState::Closing,
            RTCDataChannelState::Closed => ChannelState::Closed,
            _ => ChannelState::Connecting,
        }
    }

    async fn send_text(&self, text: String) -> Result<(), RelayError> {
        self.dc.send_text(text).await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), RelayError> {
        self.dc.close().await?;
        Ok(())
    }
}

/// Создает конфигурацию для peer connection
pub fn rtc_config(config: &RelayConfig) -> RTCConfiguration {
    RTCConfiguration {
        ice_servers: get_user_ice_servers(&config.ice_servers),
        ice_candidate_pool_size: config.ice_candidate_pool_size,
        bundle_policy: RTCBundlePolicy::MaxBundle,
        rtcp_mux_policy: RTCRtcpMuxPolicy::Require,
        ..Default::default()
    }
}

/// Переводит серверы из конфигурации в формат webrtc
pub fn get_user_ice_servers(servers: &[ServerConfig]) -> Vec<RTCIceServer> {
    servers
        .iter()
        .map(|config| RTCIceServer {
            urls: vec![add_ice_url_scheme(config)],
            username: config.username.clone().unwrap_or_default(),
            credential: config.credential.clone().unwrap_or_default(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peer::types::IceServerKind;

    #[test]
    fn turn_credentials_are_carried() {
        let servers = vec![ServerConfig {
            id: "relay".into(),
            r#type: IceServerKind::Turn,
            url: "turn.example.org:3478".into(),
            username: Some("alice".into()),
            credential: Some("secret".into()),
        }];
        let ice = get_user_ice_servers(&servers);
        assert_eq!(ice.len(), 1);
        assert_eq!(ice[0].urls, vec!["turn:turn.example.org:3478".to_string()]);
        assert_eq!(ice[0].username, "alice");
        assert_eq!(ice[0].credential, "secret");
    }

    #[test]
    fn config_policies() {
        let cfg = rtc_config(&RelayConfig::default());
        assert_eq!(cfg.bundle_policy, RTCBundlePolicy::MaxBundle);
        assert_eq!(cfg.rtcp_mux_policy, RTCRtcpMuxPolicy::Require);
        assert_eq!(cfg.ice_servers.len(), 2);
    }
}
