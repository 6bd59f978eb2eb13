// Copyright (c) 2022 MASSA LABS <info@massa.net>

use std::sync::Arc;

use parking_lot::RwLock;
use pob_channel::sender::PobSender;
use pob_models::block_id::BlockId;
use pob_models::transaction::SignedTransaction;
use pob_models::tx_id::TxId;
use pob_pool_exports::{
    LinkedBlockNotification, PoolController, PoolError, PoolManager, TxStatus,
};
use tracing::info;

use crate::tx_pool::TxPool;
use crate::worker::{Command, FreezeGate};

/// Retrieval goes through the shared state; modifications are asked through
/// the command channel so that senders never wait on pool internals.
#[derive(Clone)]
pub(crate) struct PoolControllerImpl {
    pub(crate) sender: PobSender<Command>,
    pub(crate) state: Arc<RwLock<TxPool>>,
    pub(crate) frozen: FreezeGate,
}

impl PoolController for PoolControllerImpl {
    fn add_transaction(&self, tx: SignedTransaction) -> Result<(), PoolError> {
        self.sender
            .try_send(Command::AddTx(tx))
            .map_err(|err| PoolError::ChannelError(err.to_string()))
    }

    fn notify_linked_block(&self, notification: LinkedBlockNotification) -> Result<(), PoolError> {
        self.sender
            .send(Command::NotifyLinked(notification))
            .map_err(|err| PoolError::ChannelError(err.to_string()))
    }

    fn pending_snapshot(&self) -> (Vec<SignedTransaction>, Option<BlockId>) {
        self.state.read().pending_snapshot()
    }

    fn transaction_status(&self, id: &TxId, at: Option<&BlockId>) -> TxStatus {
        self.state.read().transaction_status(id, at)
    }

    fn freeze(&self) {
        let (lock, _) = &*self.frozen;
        *lock.lock() = true;
    }

    fn unfreeze(&self) {
        let (lock, condvar) = &*self.frozen;
        *lock.lock() = false;
        condvar.notify_all();
    }

    fn len(&self) -> usize {
        self.state.read().len()
    }

    fn contains(&self, id: &TxId) -> bool {
        self.state.read().contains(id)
    }

    fn clone_box(&self) -> Box<dyn PoolController> {
        Box::new(self.clone())
    }
}

pub(crate) struct PoolManagerImpl {
    pub(crate) sender: PobSender<Command>,
    pub(crate) handle: Option<std::thread::JoinHandle<()>>,
}

impl PoolManager for PoolManagerImpl {
    fn stop(&mut self) {
        info!("stopping pool worker...");
        if let Some(handle) = self.handle.take() {
            let _ = self.sender.send(Command::Stop);
            handle
                .join()
                .expect("pool thread panicked on try to join");
        }
        info!("pool worker stopped");
    }
}
