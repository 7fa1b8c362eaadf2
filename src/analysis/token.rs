//! Token streams flowing from a tokenizer to the indexer.
//!
//! A [`TokenStream`] is the receiving end of a bounded channel. The producer
//! runs on its own thread and blocks once the channel is full; dropping the
//! sender at the end of the document ends the stream.
//!
//! ```
//! use flash::analysis::TokenStream;
//!
//! let stream = TokenStream::spawn(2, |sender| {
//!     for word in ["a", "b", "c"] {
//!         if sender.send(word.to_string()).is_err() {
//!             break;
//!         }
//!     }
//! });
//! assert_eq!(stream.collect::<Vec<_>>(), vec!["a", "b", "c"]);
//! ```

use std::thread;

use crossbeam_channel::{Receiver, Sender, bounded};

/// A lazy, finite, non-restartable sequence of normalized terms.
#[derive(Debug)]
pub struct TokenStream {
    receiver: Receiver<String>,
}

impl TokenStream {
    /// Run `producer` on a new thread, feeding a channel of `capacity` terms.
    pub fn spawn<F>(capacity: usize, producer: F) -> Self
    where
        F: FnOnce(Sender<String>) + Send + 'static,
    {
        let (sender, receiver) = bounded(capacity.max(1));
        thread::spawn(move || producer(sender));
        TokenStream { receiver }
    }
}

impl Iterator for TokenStream {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.receiver.recv().ok()
    }
}
