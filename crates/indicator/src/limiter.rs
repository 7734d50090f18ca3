//! Minimum-interval wrapper around a fire-and-forget effect.

#![forbid(unsafe_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::time::Instant;

type Effect<T> = Arc<dyn Fn(T) -> BoxFuture<'static, ()> + Send + Sync>;

struct Window<T> {
    last_run: Option<Instant>,
    pending: Option<T>,
    timer_armed: bool,
}

/// Invokes a wrapped effect at most once per `min_interval`.
///
/// Calls inside a closed window replace each other; only the most recent
/// arguments survive and run when the window reopens. The effect is
/// fire-and-forget, so no result is propagated. No timer exists unless a
/// call had to be deferred.
pub struct RateLimited<T> {
    effect: Effect<T>,
    min_interval: Duration,
    window: Arc<Mutex<Window<T>>>,
}

impl<T> Clone for RateLimited<T> {
    fn clone(&self) -> Self {
        Self {
            effect: self.effect.clone(),
            min_interval: self.min_interval,
            window: self.window.clone(),
        }
    }
}

impl<T: Send + 'static> RateLimited<T> {
    pub fn new<F>(min_interval: Duration, effect: F) -> Self
    where
        F: Fn(T) -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        Self {
            effect: Arc::new(effect),
            min_interval,
            window: Arc::new(Mutex::new(Window {
                last_run: None,
                pending: None,
                timer_armed: false,
            })),
        }
    }

    /// Run the effect now if the window is open, otherwise park `args` in
    /// the pending slot (replacing any previous occupant) and arm a single
    /// flush timer for `min_interval` after the last actual execution.
    pub fn call(&self, args: T) {
        let mut w = self.window.lock().unwrap();
        let open = w
            .last_run
            .map_or(true, |prev| prev.elapsed() >= self.min_interval);
        // An armed timer means an older flush is scheduled; routing through
        // the pending slot keeps it from publishing stale args after us.
        if open && !w.timer_armed {
            w.last_run = Some(Instant::now());
            drop(w);
            tokio::spawn((self.effect)(args));
            return;
        }
        w.pending = Some(args);
        if w.timer_armed {
            return;
        }
        w.timer_armed = true;
        let deadline = w.last_run.unwrap_or_else(Instant::now) + self.min_interval;
        drop(w);
        let this = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            this.flush();
        });
    }

    fn flush(&self) {
        let args = {
            let mut w = self.window.lock().unwrap();
            w.timer_armed = false;
            match w.pending.take() {
                Some(args) => {
                    w.last_run = Some(Instant::now());
                    args
                }
                None => return,
            }
        };
        tokio::spawn((self.effect)(args));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn limited(
        min_interval: Duration,
    ) -> (RateLimited<String>, mpsc::UnboundedReceiver<(String, Instant)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let rl = RateLimited::new(
            min_interval,
            move |s: String| -> BoxFuture<'static, ()> {
                let tx = tx.clone();
                Box::pin(async move {
                    let _ = tx.send((s, Instant::now()));
                })
            },
        );
        (rl, rx)
    }

    #[tokio::test(start_paused = true)]
    async fn first_call_runs_immediately() {
        let (rl, mut rx) = limited(Duration::from_millis(2500));
        let t0 = Instant::now();
        rl.call("a".into());
        let (s, at) = rx.recv().await.unwrap();
        assert_eq!(s, "a");
        assert_eq!(at, t0);
    }

    #[tokio::test(start_paused = true)]
    async fn burst_collapses_to_latest_at_window_edge() {
        let (rl, mut rx) = limited(Duration::from_millis(2500));
        let t0 = Instant::now();
        rl.call("first".into());
        tokio::time::sleep(Duration::from_millis(100)).await;
        rl.call("second".into());
        rl.call("third".into());
        let (s, at) = rx.recv().await.unwrap();
        assert_eq!(s, "first");
        assert_eq!(at, t0);
        let (s, at) = rx.recv().await.unwrap();
        assert_eq!(s, "third");
        assert_eq!(at.duration_since(t0), Duration::from_millis(2500));
        // Intermediates are dropped, not queued.
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn reopened_window_runs_immediately() {
        let (rl, mut rx) = limited(Duration::from_millis(500));
        rl.call("a".into());
        let _ = rx.recv().await.unwrap();
        tokio::time::sleep(Duration::from_millis(600)).await;
        let t1 = Instant::now();
        rl.call("b".into());
        let (s, at) = rx.recv().await.unwrap();
        assert_eq!(s, "b");
        assert_eq!(at, t1);
    }

    #[tokio::test(start_paused = true)]
    async fn deferred_run_starts_a_fresh_window() {
        let (rl, mut rx) = limited(Duration::from_millis(1000));
        rl.call("a".into());
        tokio::time::sleep(Duration::from_millis(100)).await;
        rl.call("b".into());
        let _ = rx.recv().await.unwrap();
        let (_, at_b) = rx.recv().await.unwrap();
        // A call right after the flush is inside the new window again.
        rl.call("c".into());
        let (s, at_c) = rx.recv().await.unwrap();
        assert_eq!(s, "c");
        assert_eq!(at_c.duration_since(at_b), Duration::from_millis(1000));
    }
}
