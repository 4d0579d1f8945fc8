//! In-flight remote calls awaiting a reply.
//!
//! Calls are keyed the way their reply will identify them: by full name in
//! text mode and by name hash in binary mode. A hashed reply with no hashed
//! queue falls back to a named call with the same hash, which covers calls
//! made before the host's wire mode was known. Each reply consumes the oldest
//! continuation for its function: overlapping calls to the same function
//! resolve in call order.

use crate::codec::FunctionId;
use crate::error::{ChannelError, Result};
use crate::value::Value;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Sleep;

type Reply = Result<Vec<Value>>;

#[derive(Default)]
pub struct PendingCalls {
    calls: Mutex<HashMap<FunctionId, VecDeque<oneshot::Sender<Reply>>>>,
}

impl PendingCalls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a continuation behind any already waiting on `id`.
    pub fn register(&self, id: FunctionId) -> oneshot::Receiver<Reply> {
        let (tx, rx) = oneshot::channel();
        self.calls.lock().entry(id).or_default().push_back(tx);
        rx
    }

    /// Hand `args` to the oldest continuation waiting on `id`.
    ///
    /// Returns the arguments back when nothing is waiting. Otherwise returns
    /// whether the caller was still there to receive them; a caller that gave
    /// up (dropped or timed out) still consumes its reply.
    pub fn resolve(&self, id: &FunctionId, args: Vec<Value>) -> std::result::Result<bool, Vec<Value>> {
        let tx = {
            let mut calls = self.calls.lock();
            let key = match id {
                FunctionId::Hash(hash) if !calls.contains_key(id) => calls
                    .keys()
                    .find(|waiting| matches!(waiting, FunctionId::Name(_)) && waiting.key() == *hash)
                    .cloned(),
                _ => Some(id.clone()),
            };
            let Some(key) = key else {
                return Err(args);
            };
            let Some(queue) = calls.get_mut(&key) else {
                return Err(args);
            };
            let tx = queue.pop_front();
            if queue.is_empty() {
                calls.remove(&key);
            }
            tx
        };

        match tx {
            Some(tx) => {
                let delivered = tx.send(Ok(args)).is_ok();
                if !delivered {
                    tracing::trace!("Discarding reply for {}: caller went away", id);
                }
                Ok(delivered)
            }
            None => Err(args),
        }
    }

    /// Reject every waiting continuation and clear the registry.
    pub fn reject_all(&self, reason: &str) -> usize {
        let drained: Vec<_> = self.calls.lock().drain().collect();

        let mut count = 0;
        for (_, queue) in drained {
            for tx in queue {
                let _ = tx.send(Err(ChannelError::ChannelClosed(reason.to_string())));
                count += 1;
            }
        }
        count
    }

    pub fn pending_for(&self, id: &FunctionId) -> usize {
        self.calls.lock().get(id).map_or(0, VecDeque::len)
    }

    pub fn len(&self) -> usize {
        self.calls.lock().values().map(VecDeque::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.lock().is_empty()
    }
}

enum CallState {
    Waiting {
        rx: oneshot::Receiver<Reply>,
        timeout: Option<Duration>,
        deadline: Option<Pin<Box<Sleep>>>,
    },
    Ready(Option<Reply>),
}

/// Future returned by a remote call. Resolves with the reply arguments.
#[must_use = "the reply is lost unless the call is awaited"]
pub struct PendingCall {
    function: String,
    state: CallState,
}

impl PendingCall {
    pub(crate) fn waiting(
        function: &str,
        rx: oneshot::Receiver<Reply>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            function: function.to_string(),
            state: CallState::Waiting {
                rx,
                timeout,
                deadline: None,
            },
        }
    }

    pub(crate) fn ready(function: &str, reply: Reply) -> Self {
        Self {
            function: function.to_string(),
            state: CallState::Ready(Some(reply)),
        }
    }

    pub fn function(&self) -> &str {
        &self.function
    }
}

impl Future for PendingCall {
    type Output = Reply;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Reply> {
        let this = self.get_mut();
        match &mut this.state {
            CallState::Ready(reply) => Poll::Ready(reply.take().unwrap_or_else(|| {
                Err(ChannelError::ChannelClosed("reply already taken".to_string()))
            })),
            CallState::Waiting {
                rx,
                timeout,
                deadline,
            } => {
                if let Poll::Ready(result) = Pin::new(rx).poll(cx) {
                    return Poll::Ready(result.unwrap_or_else(|_| {
                        Err(ChannelError::ChannelClosed("registry dropped".to_string()))
                    }));
                }

                let Some(after) = *timeout else {
                    return Poll::Pending;
                };
                let sleep = deadline.get_or_insert_with(|| Box::pin(tokio::time::sleep(after)));
                match sleep.as_mut().poll(cx) {
                    Poll::Ready(()) => Poll::Ready(Err(ChannelError::timeout(&this.function, after))),
                    Poll::Pending => Poll::Pending,
                }
            }
        }
    }
}
