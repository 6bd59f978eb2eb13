// Copyright (c) 2022 MASSA LABS <info@massa.net>
//! Interface to the transaction execution collaborator.
//!
//! The virtual machine and the versioned state store live outside the
//! consensus core; this crate defines the MVCC view surface the core drives
//! (checkout a committed snapshot, execute, compare roots, commit) plus a
//! deterministic in-memory implementation used by tests and by nodes running
//! without a real execution backend.

#![warn(missing_docs)]

mod controller_traits;
mod error;
/// deterministic in-memory execution backend
pub mod sim;
mod types;

pub use controller_traits::{ExecutionController, StateView};
pub use error::ExecutionError;
pub use types::{ReceiptStatus, TxReceipt};
