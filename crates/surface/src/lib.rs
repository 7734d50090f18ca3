//! Lexibar host surface interfaces.
//!
//! This crate defines the traits the indicator renders through. The real
//! implementations live in the host (browser action bindings, compose
//! window, localization tables); in-process mocks live here for tests.

#![forbid(unsafe_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::debug;

use lexibar_core::ContextId;

/// Errors a host surface call can produce.
///
/// All of these are transient from the indicator's point of view: a later
/// snapshot re-renders, so callers catch at the cycle boundary and move on.
#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    /// The target context disappeared (e.g. the tab closed mid-render).
    #[error("gone: {0}")]
    Gone(String),
    /// The surface does not implement this sub-operation.
    #[error("unsupported: {0}")]
    Unsupported(String),
    #[error("internal: {0}")]
    Internal(String),
}

pub type SurfaceResult<T> = Result<T, SurfaceError>;

/// One toolbar rendering surface exposed by the host.
///
/// Every call is asynchronous and may fail independently; `context`
/// scopes the call to one UI context, `None` means global.
#[async_trait::async_trait]
pub trait ToolbarSurface: Send + Sync {
    async fn set_icon(&self, icon_key: &str, context: Option<ContextId>) -> SurfaceResult<()>;
    async fn set_title(&self, title: &str, context: Option<ContextId>) -> SurfaceResult<()>;
    async fn set_badge_text(&self, text: &str, context: Option<ContextId>) -> SurfaceResult<()>;
    async fn set_badge_background_color(
        &self,
        color: Option<&str>,
        context: Option<ContextId>,
    ) -> SurfaceResult<()>;
}

/// Message-table lookup, owned by the host.
pub trait MessageLookup: Send + Sync {
    /// Resolve a message key with ordered template arguments.
    fn message(&self, key: &str, args: &[String]) -> String;
}

/// Pass-through lookup for tests and demos: renders `key` or `key(a, b)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyEcho;

impl MessageLookup for KeyEcho {
    fn message(&self, key: &str, args: &[String]) -> String {
        if args.is_empty() {
            key.to_string()
        } else {
            format!("{}({})", key, args.join(", "))
        }
    }
}

// ----------------- Primary/secondary pair -----------------

/// A rendering target: the always-present primary surface plus an optional
/// secondary one (e.g. a compose-window action that only some hosts have).
///
/// Calls fan out to both; a missing secondary is skipped, and a failing
/// secondary never affects the primary result.
#[derive(Clone)]
pub struct SurfacePair {
    primary: Arc<dyn ToolbarSurface>,
    secondary: Option<Arc<dyn ToolbarSurface>>,
}

impl SurfacePair {
    pub fn single(primary: Arc<dyn ToolbarSurface>) -> Self {
        Self { primary, secondary: None }
    }

    pub fn with_secondary(
        primary: Arc<dyn ToolbarSurface>,
        secondary: Arc<dyn ToolbarSurface>,
    ) -> Self {
        Self { primary, secondary: Some(secondary) }
    }

    pub fn has_secondary(&self) -> bool {
        self.secondary.is_some()
    }

    pub async fn set_icon(&self, icon_key: &str, context: Option<ContextId>) -> SurfaceResult<()> {
        let res = self.primary.set_icon(icon_key, context).await;
        if let Some(sec) = &self.secondary {
            if let Err(e) = sec.set_icon(icon_key, context).await {
                debug!(error = %e, "surface: secondary set_icon failed");
            }
        }
        res
    }

    pub async fn set_title(&self, title: &str, context: Option<ContextId>) -> SurfaceResult<()> {
        let res = self.primary.set_title(title, context).await;
        if let Some(sec) = &self.secondary {
            if let Err(e) = sec.set_title(title, context).await {
                debug!(error = %e, "surface: secondary set_title failed");
            }
        }
        res
    }

    pub async fn set_badge_text(&self, text: &str, context: Option<ContextId>) -> SurfaceResult<()> {
        let res = self.primary.set_badge_text(text, context).await;
        if let Some(sec) = &self.secondary {
            if let Err(e) = sec.set_badge_text(text, context).await {
                debug!(error = %e, "surface: secondary set_badge_text failed");
            }
        }
        res
    }

    pub async fn set_badge_background_color(
        &self,
        color: Option<&str>,
        context: Option<ContextId>,
    ) -> SurfaceResult<()> {
        let res = self.primary.set_badge_background_color(color, context).await;
        if let Some(sec) = &self.secondary {
            if let Err(e) = sec.set_badge_background_color(color, context).await {
                debug!(error = %e, "surface: secondary set_badge_background_color failed");
            }
        }
        res
    }
}

// ----------------- Mock implementation -----------------

/// One recorded surface call, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceCall {
    Icon { key: String, context: Option<ContextId> },
    Title { text: String, context: Option<ContextId> },
    BadgeText { text: String, context: Option<ContextId> },
    BadgeColor { color: Option<String>, context: Option<ContextId> },
}

/// Recording surface for tests: keeps every call, can fail on demand and
/// can simulate host latency so cycles stay in flight.
#[derive(Default)]
pub struct MockSurface {
    calls: Mutex<Vec<SurfaceCall>>,
    fail: AtomicBool,
    latency: Option<Duration>,
}

impl MockSurface {
    pub fn recording() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let s = Self::default();
        s.fail.store(true, Ordering::SeqCst);
        s
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self { latency: Some(latency), ..Self::default() }
    }

    pub fn set_failing(&self, on: bool) {
        self.fail.store(on, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<SurfaceCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Icon keys in application order.
    pub fn icon_keys(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                SurfaceCall::Icon { key, .. } => Some(key),
                _ => None,
            })
            .collect()
    }

    /// Applied titles in application order.
    pub fn titles(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                SurfaceCall::Title { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    async fn record(&self, call: SurfaceCall) -> SurfaceResult<()> {
        if let Some(d) = self.latency {
            tokio::time::sleep(d).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(SurfaceError::Internal("mock surface set to fail".into()));
        }
        self.calls.lock().unwrap().push(call);
        Ok(())
    }
}

#[async_trait::async_trait]
impl ToolbarSurface for MockSurface {
    async fn set_icon(&self, icon_key: &str, context: Option<ContextId>) -> SurfaceResult<()> {
        self.record(SurfaceCall::Icon { key: icon_key.to_string(), context }).await
    }

    async fn set_title(&self, title: &str, context: Option<ContextId>) -> SurfaceResult<()> {
        self.record(SurfaceCall::Title { text: title.to_string(), context }).await
    }

    async fn set_badge_text(&self, text: &str, context: Option<ContextId>) -> SurfaceResult<()> {
        self.record(SurfaceCall::BadgeText { text: text.to_string(), context }).await
    }

    async fn set_badge_background_color(
        &self,
        color: Option<&str>,
        context: Option<ContextId>,
    ) -> SurfaceResult<()> {
        self.record(SurfaceCall::BadgeColor { color: color.map(|c| c.to_string()), context })
            .await
    }
}
