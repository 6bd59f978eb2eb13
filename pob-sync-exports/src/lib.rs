// Copyright (c) 2022 MASSA LABS <info@massa.net>
//! Exports of the synchronizer: peer message model with its wire codec, the
//! transport seam, controller traits and configuration.

#![warn(missing_docs)]

mod config;
mod controller_traits;
mod error;
mod messages;
mod network;
/// test transports and helpers
pub mod test_exports;

pub use config::SyncConfig;
pub use controller_traits::{SyncController, SyncManager};
pub use error::SyncError;
pub use messages::{
    BlockInfo, BlockMessage, BlockMessageKind, PeerId, PeerMessage, PeerMessageDeserializer,
    PeerMessageSerializer,
};
pub use network::{NullNetwork, PeerNetwork};
