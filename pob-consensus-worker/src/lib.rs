// Copyright (c) 2022 MASSA LABS <info@massa.net>
//! The PoB consensus engine: a verify loop ingesting incoming blocks and a
//! schedule loop producing blocks on this node's witness slots. Both loops
//! share the block cache and the processor that carries a block through
//! verification, linking, LIB advancement and pool notification.

#![warn(missing_docs)]

mod controller;
mod processor;
mod schedule;
mod verify;
mod worker;

pub use worker::start_pob_worker;

#[cfg(test)]
mod tests;
