use std::ops::{Deref, DerefMut};

use crossbeam::channel::{SendError, Sender, TrySendError};
use tracing::debug;

#[derive(Clone)]
pub struct PobSender<T> {
    pub(crate) sender: Sender<T>,
    pub(crate) name: String,
}

impl<T> PobSender<T> {
    /// Sends a message, blocking while the channel is full
    pub fn send(&self, msg: T) -> Result<(), SendError<T>> {
        self.sender.send(msg)
    }

    /// Attempts to send a message without blocking
    pub fn try_send(&self, msg: T) -> Result<(), TrySendError<T>> {
        let res = self.sender.try_send(msg);
        if let Err(TrySendError::Full(_)) = &res {
            debug!("channel {} is full", self.name);
        }
        res
    }

    /// Name of the channel, for log context
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T> Deref for PobSender<T> {
    type Target = Sender<T>;

    fn deref(&self) -> &Self::Target {
        &self.sender
    }
}

impl<T> DerefMut for PobSender<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.sender
    }
}
