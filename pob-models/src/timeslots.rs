// Copyright (c) 2022 MASSA LABS <info@massa.net>
//! Conversion between wall-clock nanosecond times and witness slots.

use crate::config::{BLOCK_NUM_PER_WITNESS, SUB_SLOT_TIME};
use crate::slot::Slot;
use pob_signature::PublicKey;
use pob_time::PobTime;

/// Absolute sub-slot index of a time
pub fn sub_slot_index(time: PobTime) -> u64 {
    time.to_nanos() / SUB_SLOT_TIME.to_nanos()
}

/// The slot a time falls into
pub fn slot_of_time(time: PobTime) -> Slot {
    let index = sub_slot_index(time);
    Slot::new(
        index / BLOCK_NUM_PER_WITNESS,
        (index % BLOCK_NUM_PER_WITNESS) as u8,
    )
}

/// Start time of a slot's sub-slot
pub fn slot_start_time(slot: Slot) -> PobTime {
    PobTime::from_nanos(
        (slot.window * BLOCK_NUM_PER_WITNESS + slot.sub_slot as u64)
            .saturating_mul(SUB_SLOT_TIME.to_nanos()),
    )
}

/// Start time of the sub-slot following the one containing `time`
pub fn next_sub_slot_time(time: PobTime) -> PobTime {
    PobTime::from_nanos((sub_slot_index(time) + 1).saturating_mul(SUB_SLOT_TIME.to_nanos()))
}

/// Index into the ordered witness list of the witness scheduled at `time`.
///
/// One witness owns all `BLOCK_NUM_PER_WITNESS` sub-slots of a window, so the
/// sub-slot index is divided down to the window before being reduced modulo
/// the list length.
pub fn witness_index_of_time(time: PobTime, witness_count: usize) -> Option<usize> {
    if witness_count == 0 {
        return None;
    }
    Some((slot_of_time(time).window % witness_count as u64) as usize)
}

/// The witness scheduled at `time` in an ordered witness list
pub fn witness_of_time(time: PobTime, witnesses: &[PublicKey]) -> Option<&PublicKey> {
    witness_index_of_time(time, witnesses.len()).map(|index| &witnesses[index])
}

/// Whether two times fall inside the same witness slot
pub fn same_production_window(a: PobTime, b: PobTime) -> bool {
    slot_of_time(a).window == slot_of_time(b).window
}
