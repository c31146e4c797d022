pub mod api;
pub mod broadcast;
pub mod client;
pub mod mock;
pub mod types;

pub use api::ChainApi;
pub use broadcast::{
    BroadcastMode, Broadcaster, CustomDataOperation, DisabledBroadcaster, GatewayBroadcaster,
    TransferOperation,
};
pub use client::RpcChainClient;
pub use types::*;
