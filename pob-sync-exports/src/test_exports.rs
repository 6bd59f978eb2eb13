// Copyright (c) 2022 MASSA LABS <info@massa.net>
//! Transport doubles for synchronizer and consensus tests.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::messages::{PeerId, PeerMessage};
use crate::network::PeerNetwork;
use crate::SyncError;

/// Transport double recording every outbound message for assertions.
#[derive(Clone, Default)]
pub struct LoopbackNetwork {
    broadcasts: Arc<Mutex<Vec<PeerMessage>>>,
    unicasts: Arc<Mutex<Vec<(PeerId, PeerMessage)>>>,
    bp_overlay: Arc<Mutex<bool>>,
}

impl LoopbackNetwork {
    /// Creates an empty loopback transport
    pub fn new() -> Self {
        Default::default()
    }

    /// Drains the recorded broadcasts
    pub fn take_broadcasts(&self) -> Vec<PeerMessage> {
        std::mem::take(&mut *self.broadcasts.lock())
    }

    /// Drains the recorded unicasts
    pub fn take_unicasts(&self) -> Vec<(PeerId, PeerMessage)> {
        std::mem::take(&mut *self.unicasts.lock())
    }

    /// Whether the node currently sits on the block-producer overlay
    pub fn on_bp_overlay(&self) -> bool {
        *self.bp_overlay.lock()
    }
}

impl PeerNetwork for LoopbackNetwork {
    fn broadcast(&self, message: &PeerMessage) -> Result<(), SyncError> {
        self.broadcasts.lock().push(message.clone());
        Ok(())
    }

    fn send_to(&self, peer: &PeerId, message: &PeerMessage) -> Result<(), SyncError> {
        self.unicasts.lock().push((peer.clone(), message.clone()));
        Ok(())
    }

    fn connect_bp_overlay(&self, connect: bool) {
        *self.bp_overlay.lock() = connect;
    }

    fn clone_box(&self) -> Box<dyn PeerNetwork> {
        Box::new(self.clone())
    }
}
