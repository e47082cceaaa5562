//! Progress channel between the pipeline stages and whoever displays them.
//!
//! Any number of workers may post through cloned [`ProgressSink`]s. Messages
//! from a single producer keep their order; across producers they interleave.

use crossbeam_channel::{Receiver, Sender, TryIter};

/// A status line posted by a stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgressMessage {
    /// Who posted the message, e.g. `make_fragments`.
    pub sender: String,
    pub text: String,
}

impl std::fmt::Display for ProgressMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.sender, self.text)
    }
}

/// Producer side. Cheap to clone, never blocks.
#[derive(Clone, Debug)]
pub struct ProgressSink {
    tx: Option<Sender<ProgressMessage>>,
}

impl ProgressSink {
    /// A sink without a reader. Messages only go to the log.
    pub fn disconnected() -> Self {
        Self { tx: None }
    }

    /// Posts a message. A dropped receiver is not an error: the pipeline keeps
    /// running and the message still reaches the log.
    pub fn post<S: Into<String>>(&self, sender: &str, text: S) {
        let message = ProgressMessage {
            sender: sender.to_string(),
            text: text.into(),
        };
        log::info!(target: "recon3d::progress", "{message}");
        if let Some(tx) = &self.tx {
            let _ = tx.send(message);
        }
    }
}

/// Consumer side.
#[derive(Debug)]
pub struct ProgressReceiver {
    rx: Receiver<ProgressMessage>,
}

impl ProgressReceiver {
    /// Blocks until a message arrives. Returns `None` once every sink is gone.
    pub fn recv(&self) -> Option<ProgressMessage> {
        self.rx.recv().ok()
    }

    pub fn try_iter(&self) -> TryIter<'_, ProgressMessage> {
        self.rx.try_iter()
    }

    /// Takes every message posted so far.
    pub fn drain(&self) -> Vec<ProgressMessage> {
        self.rx.try_iter().collect()
    }
}

/// Creates an unbounded multi-producer progress channel.
pub fn channel() -> (ProgressSink, ProgressReceiver) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (ProgressSink { tx: Some(tx) }, ProgressReceiver { rx })
}
