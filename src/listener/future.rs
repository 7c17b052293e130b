use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{debug, warn};

use super::BasicMessageListener;
use crate::error::{MessagingError, Result};
use crate::message::Envelope;

enum State<T> {
    Waiting,
    Done(Result<T>),
    Cancelled,
}

/// Single-slot handoff between the delivery thread and `get` callers.
pub(crate) struct FutureSlot<T> {
    state: Mutex<State<T>>,
    ready: Condvar,
}

impl<T> FutureSlot<T> {
    fn new() -> Self {
        Self {
            state: Mutex::new(State::Waiting),
            ready: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store the outcome if still waiting, running `on_done` before any
    /// waiter wakes. Returns `false` if the outcome was dropped.
    pub(crate) fn resolve(&self, outcome: Result<T>, on_done: impl FnOnce()) -> bool {
        let mut state = self.lock();
        if !matches!(*state, State::Waiting) {
            return false;
        }
        *state = State::Done(outcome);
        on_done();
        self.ready.notify_all();
        true
    }
}

/// The pending response of a request sent with
/// [`MessageProcessor::send_rpc`](crate::MessageProcessor::send_rpc).
///
/// Starts out waiting. The first response moves it to done and closes the
/// reply consumer; later responses are dropped. A timed out `get_timeout`
/// leaves it waiting, so the caller may wait again.
pub struct ResponseFuture<T: Envelope> {
    slot: Arc<FutureSlot<T>>,
    listener: Arc<BasicMessageListener<T>>,
}

impl<T: Envelope> ResponseFuture<T> {
    /// A waiting future and the listener that resolves it.
    pub fn new() -> Self {
        let slot = Arc::new(FutureSlot::new());
        let listener = Arc::new(BasicMessageListener::resolving(Arc::clone(&slot)));
        Self { slot, listener }
    }

    /// The listener to register on the reply consumer.
    pub fn listener(&self) -> Arc<BasicMessageListener<T>> {
        Arc::clone(&self.listener)
    }

    /// Block until the response arrives.
    ///
    /// Returns the same result on every call once resolved.
    pub fn get(&self) -> Result<T> {
        let state = self.slot.lock();
        let state = self
            .slot
            .ready
            .wait_while(state, |state| matches!(state, State::Waiting))
            .unwrap_or_else(PoisonError::into_inner);
        outcome(&state)
    }

    /// Block for at most `timeout`.
    ///
    /// Timing out does not change the future's state.
    pub fn get_timeout(&self, timeout: Duration) -> Result<T> {
        let state = self.slot.lock();
        let (state, _) = self
            .slot
            .ready
            .wait_timeout_while(state, timeout, |state| matches!(state, State::Waiting))
            .unwrap_or_else(PoisonError::into_inner);
        match *state {
            State::Waiting => Err(MessagingError::Timeout(timeout)),
            _ => outcome(&state),
        }
    }

    /// Cancel a waiting future by closing its reply consumer.
    ///
    /// Returns `false` if the future already finished. Delivery already in
    /// progress cannot be interrupted, so `may_interrupt == false` is refused.
    pub fn cancel(&self, may_interrupt: bool) -> bool {
        {
            let mut state = self.slot.lock();
            if !matches!(*state, State::Waiting) {
                return false;
            }
            if !may_interrupt {
                warn!("refusing to cancel response future without interrupting delivery");
                return false;
            }
            *state = State::Cancelled;
            self.slot.ready.notify_all();
        }
        self.listener.close_consumer();
        debug!("response future cancelled");
        true
    }

    pub fn is_done(&self) -> bool {
        !matches!(*self.slot.lock(), State::Waiting)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(*self.slot.lock(), State::Cancelled)
    }
}

impl<T: Envelope> Default for ResponseFuture<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn outcome<T: Clone>(state: &State<T>) -> Result<T> {
    match state {
        State::Done(result) => result.clone(),
        State::Cancelled => Err(MessagingError::Cancelled),
        State::Waiting => unreachable!("outcome read while waiting"),
    }
}

impl<T: Envelope> fmt::Debug for ResponseFuture<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match *self.slot.lock() {
            State::Waiting => "waiting",
            State::Done(Ok(_)) => "done",
            State::Done(Err(_)) => "failed",
            State::Cancelled => "cancelled",
        };
        f.debug_struct("ResponseFuture").field("state", &state).finish()
    }
}
