//! Search-as-you-type debouncing.

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Runs only the most recently scheduled job, once it has been quiet for
/// `delay`. Scheduling a new job cancels any job still waiting.
#[derive(Debug)]
pub struct SearchDebouncer {
    delay: Duration,
    pending: Option<JoinHandle<()>>,
}

impl SearchDebouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Replace the pending job with `job`. Must be called from within a
    /// tokio runtime.
    pub fn schedule<F>(&mut self, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();

        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            job.await;
        }));
    }

    /// Drop the pending job, if any
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    /// Whether a scheduled job has not yet finished
    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .map_or(false, |handle| !handle.is_finished())
    }
}

impl Drop for SearchDebouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn test_only_last_job_runs() {
        let ran = Arc::new(Mutex::new(Vec::new()));
        let mut debouncer = SearchDebouncer::new(Duration::from_millis(50));

        for query in ["J", "Ji", "Jid"] {
            let ran = ran.clone();
            debouncer.schedule(async move {
                ran.lock().unwrap().push(query);
            });
        }

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(*ran.lock().unwrap(), vec!["Jid"]);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test]
    async fn test_cancel_drops_pending_job() {
        let ran = Arc::new(Mutex::new(false));
        let mut debouncer = SearchDebouncer::new(Duration::from_millis(20));

        let flag = ran.clone();
        debouncer.schedule(async move {
            *flag.lock().unwrap() = true;
        });
        assert!(debouncer.is_pending());
        debouncer.cancel();

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(!*ran.lock().unwrap());
    }
}
