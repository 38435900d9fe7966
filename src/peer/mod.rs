pub mod connection;
pub mod types;

pub use connection::{ChannelLink, PeerLink, RtcChannel, RtcPeer};
pub use types::{
    ChannelState, IceCandidate, IceServerKind, PeerEvent, SdpKind, ServerConfig,
    SessionDescription, Signal,
};
