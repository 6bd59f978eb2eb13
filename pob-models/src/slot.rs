// Copyright (c) 2022 MASSA LABS <info@massa.net>

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A point in time where a block is expected.
///
/// `window` indexes the 3-second witness slot since the epoch; `sub_slot`
/// indexes the 500 ms production opportunity inside it.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    /// witness slot index
    pub window: u64,
    /// sub-slot index inside the window
    pub sub_slot: u8,
}

impl PartialOrd for Slot {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Slot {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.window, self.sub_slot).cmp(&(other.window, other.sub_slot))
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "(window: {}, sub-slot: {})", self.window, self.sub_slot)?;
        Ok(())
    }
}

impl Slot {
    /// New slot from window and sub-slot
    pub const fn new(window: u64, sub_slot: u8) -> Slot {
        Slot { window, sub_slot }
    }

    /// Returns the minimal slot
    pub const fn min() -> Slot {
        Slot {
            window: 0,
            sub_slot: 0,
        }
    }
}
