//! Termination hooks run when the process is told to stop.

use crate::error::BoxError;
use crate::runtime::CompletionSignal;
use futures::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::sync::Mutex;
use tracing::{error, info};

type TerminationHook = Box<dyn FnOnce() -> BoxFuture<'static, Result<(), BoxError>> + Send>;

/// Registry of named termination hooks.
///
/// [`Terminator::terminate`] runs each hook once, most recently registered
/// first, and then resolves the termination signal.
#[derive(Default)]
pub struct Terminator {
    hooks: Mutex<Vec<(String, TerminationHook)>>,
    signal: CompletionSignal,
}

impl Terminator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F, Fut>(&self, name: impl Into<String>, hook: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        let hook: TerminationHook = Box::new(move || hook().boxed());
        self.hooks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((name.into(), hook));
    }

    /// Run every registered hook. Later calls find nothing left to run.
    ///
    /// All hooks run even if one fails; the first failure is returned.
    pub async fn terminate(&self) -> Result<(), BoxError> {
        let hooks = std::mem::take(&mut *self.hooks.lock().unwrap_or_else(|e| e.into_inner()));
        let mut first_error = None;

        for (name, hook) in hooks.into_iter().rev() {
            info!("Running termination hook: {}", name);
            if let Err(e) = hook().await {
                error!("Termination hook '{}' failed: {}", name, e);
                first_error.get_or_insert(e);
            }
        }

        self.signal.complete();
        first_error.map_or(Ok(()), Err)
    }

    /// Signal resolved once termination has run.
    pub fn on_terminated(&self) -> CompletionSignal {
        self.signal.clone()
    }
}
