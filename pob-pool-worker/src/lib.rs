// Copyright (c) 2022 MASSA LABS <info@massa.net>
//! Fork-aware pending-transaction pool.
//!
//! The pool runs one worker thread consuming a bounded command channel.
//! Admission validates publisher and co-signer signatures and the expiry
//! windows; linked-block notifications drive the inclusion bookkeeping that
//! keeps the pending set consistent across straight extensions and reorgs.

#![warn(missing_docs)]

mod controller_impl;
mod tx_pool;
mod types;
mod worker;

pub use worker::start_pool_controller;

#[cfg(test)]
mod tests;
