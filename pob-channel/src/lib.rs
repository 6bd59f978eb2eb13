//! PobChannel is a named crossbeam channel wrapper.
//!
//! Every inter-loop signal of the node goes through one of these so that the
//! endpoint keeps the channel name around for log context, and so that
//! bounded capacities are chosen in one place per channel.
//!
//! # Example
//! ```
//! use pob_channel::PobChannel;
//! let (sender, receiver) = PobChannel::new::<String>("test".to_string(), None);
//! ```

use std::sync::Arc;

use receiver::PobReceiver;
use sender::PobSender;

pub mod receiver;
pub mod sender;

#[derive(Clone)]
pub struct PobChannel {}

impl PobChannel {
    #[allow(clippy::new_ret_no_self)]
    pub fn new<T>(name: String, capacity: Option<usize>) -> (PobSender<T>, PobReceiver<T>) {
        let (s, r) = if let Some(capacity) = capacity {
            crossbeam::channel::bounded::<T>(capacity)
        } else {
            crossbeam::channel::unbounded::<T>()
        };

        let sender = PobSender {
            sender: s,
            name: name.clone(),
        };

        let receiver = PobReceiver {
            receiver: r,
            name,
            ref_counter: Arc::new(()),
        };

        (sender, receiver)
    }
}
