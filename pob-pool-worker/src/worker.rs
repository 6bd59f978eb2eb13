// Copyright (c) 2022 MASSA LABS <info@massa.net>

//! Write worker for the pool, allowing asynchronous writes.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam::channel::RecvTimeoutError;
use parking_lot::{Condvar, Mutex, RwLock};
use pob_block_cache::SharedBlockCache;
use pob_channel::{receiver::PobReceiver, PobChannel};
use pob_models::transaction::SignedTransaction;
use pob_pool_exports::{LinkedBlockNotification, PoolConfig, PoolController, PoolManager};
use pob_storage::ChainStore;
use pob_time::PobTime;

use crate::controller_impl::{PoolControllerImpl, PoolManagerImpl};
use crate::tx_pool::TxPool;

/// Commands the worker consumes
#[derive(Clone)]
pub(crate) enum Command {
    /// admit a transaction
    AddTx(SignedTransaction),
    /// fork-aware bookkeeping for a newly linked block
    NotifyLinked(LinkedBlockNotification),
    /// stop the worker
    Stop,
}

/// Freeze latch shared between the controllers and the worker
pub(crate) type FreezeGate = Arc<(Mutex<bool>, Condvar)>;

/// Pool write thread instance
pub(crate) struct TxPoolThread {
    receiver: PobReceiver<Command>,
    state: Arc<RwLock<TxPool>>,
    frozen: FreezeGate,
    config: PoolConfig,
}

impl TxPoolThread {
    pub(crate) fn spawn(
        receiver: PobReceiver<Command>,
        state: Arc<RwLock<TxPool>>,
        frozen: FreezeGate,
        config: PoolConfig,
    ) -> std::thread::JoinHandle<()> {
        std::thread::Builder::new()
            .name("tx-pool".into())
            .spawn(move || {
                let this = Self {
                    receiver,
                    state,
                    frozen,
                    config,
                };
                this.run()
            })
            .expect("failed to spawn thread: tx-pool")
    }

    /// Blocks while a producer or verifier holds the pool still
    fn wait_unfrozen(&self) {
        let (lock, condvar) = &*self.frozen;
        let mut frozen = lock.lock();
        while *frozen {
            condvar.wait(&mut frozen);
        }
    }

    fn now() -> PobTime {
        PobTime::now().unwrap_or_default()
    }

    /// Runs the thread: drains commands, sweeps expirations on the clear
    /// interval.
    fn run(self) {
        let tick = self.config.clear_interval.to_duration();
        let mut next_sweep = Instant::now() + tick;
        loop {
            let timeout = next_sweep.saturating_duration_since(Instant::now());
            let cmd = match self.receiver.recv_timeout(timeout.max(Duration::from_millis(1))) {
                Ok(cmd) => Some(cmd),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => break,
            };

            self.wait_unfrozen();
            match cmd {
                Some(Command::AddTx(tx)) => {
                    self.state.write().add_transaction(tx, Self::now());
                }
                Some(Command::NotifyLinked(notification)) => {
                    self.state.write().handle_linked(notification, Self::now());
                }
                Some(Command::Stop) => break,
                None => {}
            }

            if Instant::now() >= next_sweep {
                self.state.write().sweep(Self::now());
                next_sweep = Instant::now() + tick;
            }
        }
    }
}

/// Starts the pool manager and controller
pub fn start_pool_controller(
    config: PoolConfig,
    cache: SharedBlockCache,
    chain: Box<dyn ChainStore>,
) -> (Box<dyn PoolManager>, Box<dyn PoolController>) {
    let (sender, receiver) = PobChannel::new::<Command>("pool_command".to_string(), Some(config.channel_size));
    let state = Arc::new(RwLock::new(TxPool::new(config, cache, chain)));
    let frozen: FreezeGate = Arc::new((Mutex::new(false), Condvar::new()));

    let handle = TxPoolThread::spawn(receiver, state.clone(), frozen.clone(), config);

    let controller = PoolControllerImpl {
        sender: sender.clone(),
        state,
        frozen,
    };
    let manager = PoolManagerImpl {
        sender,
        handle: Some(handle),
    };
    (Box::new(manager), Box::new(controller))
}
