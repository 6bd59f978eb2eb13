// Copyright (c) 2022 MASSA LABS <info@massa.net>

use crate::messages::{PeerId, PeerMessage};
use crate::SyncError;

/// Transport seam: the wire-level peer-to-peer layer lives outside the
/// consensus core and only needs to move tagged frames.
pub trait PeerNetwork: Send + Sync {
    /// Broadcasts a message to every connected peer
    fn broadcast(&self, message: &PeerMessage) -> Result<(), SyncError>;

    /// Sends a message to one peer
    fn send_to(&self, peer: &PeerId, message: &PeerMessage) -> Result<(), SyncError>;

    /// Joins or leaves the block-producer overlay
    fn connect_bp_overlay(&self, connect: bool);

    /// Returns a boxed clone of self.
    /// Useful to allow cloning `Box<dyn PeerNetwork>`.
    fn clone_box(&self) -> Box<dyn PeerNetwork>;
}

impl Clone for Box<dyn PeerNetwork> {
    fn clone(&self) -> Box<dyn PeerNetwork> {
        self.clone_box()
    }
}

/// Transport stub used when no peer-to-peer layer is attached; every send
/// succeeds and goes nowhere.
#[derive(Clone, Default)]
pub struct NullNetwork;

impl PeerNetwork for NullNetwork {
    fn broadcast(&self, _message: &PeerMessage) -> Result<(), SyncError> {
        Ok(())
    }

    fn send_to(&self, _peer: &PeerId, _message: &PeerMessage) -> Result<(), SyncError> {
        Ok(())
    }

    fn connect_bp_overlay(&self, _connect: bool) {}

    fn clone_box(&self) -> Box<dyn PeerNetwork> {
        Box::new(self.clone())
    }
}
