//! Ownership of in-flight connection tasks.
//!
//! Every accepted connection runs as its own task inside a [`JoinSet`] owned
//! by the server. Finished tasks are reaped as they complete, so the set only
//! ever holds live connections. A semaphore caps how many may run at once.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinError, JoinSet};

pub struct ConnectionSupervisor {
    tasks: JoinSet<()>,
    limit: Arc<Semaphore>,
    max_connections: usize,
}

impl ConnectionSupervisor {
    pub fn new(max_connections: usize) -> Self {
        Self {
            tasks: JoinSet::new(),
            limit: Arc::new(Semaphore::new(max_connections)),
            max_connections,
        }
    }

    /// Waits for a free connection slot.
    pub async fn acquire(&self) -> OwnedSemaphorePermit {
        // The semaphore is owned here and never closed.
        self.limit
            .clone()
            .acquire_owned()
            .await
            .expect("connection semaphore closed")
    }

    /// Starts a connection task. The permit is released when the task ends,
    /// even if it panics.
    pub fn spawn<F>(&mut self, permit: OwnedSemaphorePermit, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tasks.spawn(async move {
            let _permit = permit;
            fut.await;
        });
    }

    /// Removes every task that has already finished, without waiting.
    pub fn reap(&mut self) -> usize {
        let mut reaped = 0;
        while let Some(result) = self.tasks.try_join_next() {
            log_join(result);
            reaped += 1;
        }
        reaped
    }

    /// Waits for the next task to finish. Pends forever when empty, which
    /// makes it safe inside `select!`.
    pub async fn join_next(&mut self) {
        match self.tasks.join_next().await {
            Some(result) => log_join(result),
            None => std::future::pending().await,
        }
    }

    /// Number of tasks not yet reaped.
    pub fn active(&self) -> usize {
        self.tasks.len()
    }

    pub fn available_slots(&self) -> usize {
        self.limit.available_permits()
    }

    pub fn max_connections(&self) -> usize {
        self.max_connections
    }

    /// Waits for all in-flight connections to finish.
    pub async fn shutdown(mut self) {
        let remaining = self.tasks.len();
        if remaining > 0 {
            tracing::info!(remaining, "waiting for in-flight connections");
        }
        while let Some(result) = self.tasks.join_next().await {
            log_join(result);
        }
    }
}

fn log_join(result: Result<(), JoinError>) {
    if let Err(e) = result {
        if e.is_panic() {
            tracing::error!(error = %e, "connection task panicked");
        } else {
            tracing::debug!(error = %e, "connection task cancelled");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn finished_tasks_are_reaped() {
        let mut supervisor = ConnectionSupervisor::new(4);
        assert_eq!(supervisor.max_connections(), 4);
        for _ in 0..3 {
            let permit = supervisor.acquire().await;
            supervisor.spawn(permit, async {});
        }
        assert_eq!(supervisor.active(), 3);

        for _ in 0..3 {
            supervisor.join_next().await;
        }
        assert_eq!(supervisor.active(), 0);
        assert_eq!(supervisor.available_slots(), supervisor.max_connections());
    }

    #[tokio::test]
    async fn permits_cap_concurrency() {
        let mut supervisor = ConnectionSupervisor::new(1);
        let permit = supervisor.acquire().await;
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        supervisor.spawn(permit, async move {
            let _ = rx.await;
        });

        let blocked = tokio::time::timeout(Duration::from_millis(50), supervisor.acquire()).await;
        assert!(blocked.is_err());

        tx.send(()).unwrap();
        supervisor.join_next().await;
        let _permit = supervisor.acquire().await;
    }
}
