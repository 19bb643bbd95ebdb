//! Protocol capability boundary

pub mod event;
pub mod mock;
pub mod traits;

pub use event::NetworkEvent;
pub use mock::{MockCommand, MockNetwork, MockNetworkFactory};
pub use traits::{
    ChannelMode, Network, NetworkError, NetworkFactory, Privilege, SessionId,
};
