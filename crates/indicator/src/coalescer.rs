//! Last-write-wins update serializer for one rendering target.

#![forbid(unsafe_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use arc_swap::ArcSwapOption;
use tokio::sync::Notify;
use tracing::debug;

use lexibar_core::visual::derive_visual;
use lexibar_core::{ContextId, DerivedVisual, StateSnapshot};
use lexibar_surface::{MessageLookup, SurfacePair};

use crate::apply::apply_visual;
use crate::limiter::RateLimited;

/// Minimum interval between tooltip updates. Hosts are observed to drop
/// the visible tooltip when titles change faster than this.
pub const DEFAULT_TITLE_MIN_INTERVAL: Duration = Duration::from_millis(2500);

#[derive(Debug, Clone)]
pub struct IndicatorOptions {
    pub title_min_interval: Duration,
}

impl Default for IndicatorOptions {
    fn default() -> Self {
        Self { title_min_interval: DEFAULT_TITLE_MIN_INTERVAL }
    }
}

enum Slot {
    Idle,
    Running { pending: Option<StateSnapshot> },
}

struct Inner {
    surface: SurfacePair,
    messages: Arc<dyn MessageLookup>,
    title: RateLimited<(String, Option<ContextId>)>,
    slot: Mutex<Slot>,
    last: ArcSwapOption<DerivedVisual>,
    drained: Notify,
}

/// Serializes rendering passes for one toolbar target.
///
/// `submit` never blocks: while a cycle is in flight, newer snapshots
/// overwrite a single pending slot, so N submissions during a cycle cost
/// exactly one more cycle and render the last of the N. Host icon APIs are
/// not FIFO, so rendering every intermediate could leave a stale final
/// frame; last-write-wins avoids that.
///
/// Cloning yields another handle to the same target; independent targets
/// get independent `Indicator` values and interleave freely.
#[derive(Clone)]
pub struct Indicator {
    inner: Arc<Inner>,
}

impl Indicator {
    pub fn new(surface: SurfacePair, messages: Arc<dyn MessageLookup>) -> Self {
        Self::with_options(surface, messages, IndicatorOptions::default())
    }

    pub fn with_options(
        surface: SurfacePair,
        messages: Arc<dyn MessageLookup>,
        opts: IndicatorOptions,
    ) -> Self {
        let title_surface = surface.clone();
        let title = RateLimited::new(
            opts.title_min_interval,
            move |(text, context): (String, Option<ContextId>)| -> futures::future::BoxFuture<'static, ()> {
                let surface = title_surface.clone();
                Box::pin(async move {
                    if let Err(e) = surface.set_title(&text, context).await {
                        debug!(error = %e, "indicator: title update failed");
                    }
                })
            },
        );
        Self {
            inner: Arc::new(Inner {
                surface,
                messages,
                title,
                slot: Mutex::new(Slot::Idle),
                last: ArcSwapOption::empty(),
                drained: Notify::new(),
            }),
        }
    }

    /// Submit a new snapshot; returns immediately.
    ///
    /// Safe to call from anywhere in the schedule, including producers
    /// firing while a prior render is still in flight (the common case).
    pub fn submit(&self, snapshot: StateSnapshot) {
        let mut slot = self.inner.slot.lock().unwrap();
        match &mut *slot {
            Slot::Running { pending } => {
                if pending.is_some() {
                    metrics::counter!("lexibar_indicator_coalesced_total", 1);
                }
                *pending = Some(snapshot);
            }
            Slot::Idle => {
                *slot = Slot::Running { pending: None };
                drop(slot);
                let this = self.clone();
                tokio::spawn(async move { this.drain(snapshot).await });
            }
        }
    }

    /// Keep rendering the latest snapshot until no pending one remains.
    async fn drain(self, first: StateSnapshot) {
        let mut snapshot = first;
        loop {
            let visual = derive_visual(&snapshot);
            self.inner.last.store(Some(Arc::new(visual.clone())));
            if let Err(e) = apply_visual(
                &self.inner.surface,
                &self.inner.title,
                self.inner.messages.as_ref(),
                &visual,
                snapshot.context,
            )
            .await
            {
                // Transient: the next snapshot re-renders anyway.
                metrics::counter!("lexibar_indicator_surface_failures_total", 1);
                debug!(error = %e, "indicator: surface update failed");
            }
            metrics::counter!("lexibar_indicator_cycles_total", 1);
            let next = {
                let mut slot = self.inner.slot.lock().unwrap();
                match &mut *slot {
                    Slot::Running { pending } => match pending.take() {
                        Some(n) => Some(n),
                        None => {
                            *slot = Slot::Idle;
                            None
                        }
                    },
                    Slot::Idle => None,
                }
            };
            match next {
                Some(n) => snapshot = n,
                None => break,
            }
        }
        self.inner.drained.notify_waiters();
    }

    /// Resolve once no cycle is running and no snapshot is pending.
    pub async fn settled(&self) {
        loop {
            let notified = self.inner.drained.notified();
            tokio::pin!(notified);
            // Register interest before the check so a drain finishing in
            // between cannot be missed.
            notified.as_mut().enable();
            if matches!(*self.inner.slot.lock().unwrap(), Slot::Idle) {
                return;
            }
            notified.await;
        }
    }

    /// Most recently derived visual, if any cycle has started.
    pub fn last_visual(&self) -> Option<Arc<DerivedVisual>> {
        self.inner.last.load_full()
    }
}
