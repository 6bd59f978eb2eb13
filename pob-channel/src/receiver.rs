use std::{
    ops::{Deref, DerefMut},
    sync::Arc,
    time::{Duration, Instant},
};

use crossbeam::channel::{Receiver, RecvError, RecvTimeoutError, TryRecvError};

#[derive(Clone)]
pub struct PobReceiver<T> {
    pub(crate) receiver: Receiver<T>,
    pub(crate) name: String,
    /// reference counter to know how many receivers are cloned
    pub(crate) ref_counter: Arc<()>,
}

impl<T> PobReceiver<T> {
    /// Attempts to receive a message without blocking
    pub fn try_recv(&self) -> Result<T, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receives a message, blocking while the channel is empty
    pub fn recv(&self) -> Result<T, RecvError> {
        self.receiver.recv()
    }

    /// Receives a message, giving up after `timeout`
    pub fn recv_timeout(&self, timeout: Duration) -> Result<T, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Receives a message, giving up at `deadline`
    pub fn recv_deadline(&self, deadline: Instant) -> Result<T, RecvTimeoutError> {
        self.receiver.recv_deadline(deadline)
    }

    /// Name of the channel, for log context
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T> Deref for PobReceiver<T> {
    type Target = Receiver<T>;

    fn deref(&self) -> &Self::Target {
        &self.receiver
    }
}

impl<T> DerefMut for PobReceiver<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.receiver
    }
}
