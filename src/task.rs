use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tokio::{
    sync::{AcquireError, Semaphore},
    task::{AbortHandle, JoinError, JoinSet},
};

use crate::error::{Error, Result};

pub struct BoundedJoinSet<T> {
    semaphore: Arc<Semaphore>,
    join_set: JoinSet<T>,
}

impl<T: 'static> BoundedJoinSet<T> {
    pub fn new(max_tasks: usize) -> Self {
        let semaphore = Arc::new(Semaphore::new(max_tasks.max(1)));
        let join_set = JoinSet::new();
        BoundedJoinSet {
            semaphore,
            join_set,
        }
    }

    pub async fn spawn_blocking<F>(
        &mut self,
        task: F,
    ) -> std::result::Result<AbortHandle, AcquireError>
    where
        F: (FnOnce() -> T) + Send + 'static,
        T: Send,
    {
        let permit = self.semaphore.clone().acquire_owned().await?;
        let handle = self.join_set.spawn_blocking(move || {
            let value = task();
            drop(permit);
            value
        });
        Ok(handle)
    }

    pub async fn join_next(&mut self) -> Option<std::result::Result<T, JoinError>> {
        self.join_set.join_next().await
    }

    pub fn try_join_next(&mut self) -> Option<std::result::Result<T, JoinError>> {
        self.join_set.try_join_next()
    }
}

/// Shared flag polled by long-running operations between entries.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        CancelFlag::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}
