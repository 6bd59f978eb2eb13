// Copyright (c) 2022 MASSA LABS <info@massa.net>
//! The synchronizer: four cooperative loops that keep the node within a
//! small window of its neighborhood, plus the handler serving peer
//! requests. All loops share one quit signal and one state table.

#![warn(missing_docs)]

mod controller_impl;
mod state;
mod worker;

pub use worker::start_sync_worker;

#[cfg(test)]
mod tests;
