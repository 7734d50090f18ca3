//! Lexibar core types: loader state snapshots and derived toolbar visuals.

#![forbid(unsafe_code)]

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

pub mod visual;

/// UI context a snapshot or surface call is scoped to (e.g. a tab).
/// `None` at the call sites means the global context.
pub type ContextId = u32;

/// One named category of dictionary content, loaded and updated independently.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DataSeries {
    Words,
    Names,
    Kanji,
    Radicals,
}

impl DataSeries {
    pub const ALL: [DataSeries; 4] = [
        DataSeries::Words,
        DataSeries::Names,
        DataSeries::Kanji,
        DataSeries::Radicals,
    ];

    /// Human label used as a tooltip argument; localized templates slot it in.
    pub fn label(&self) -> &'static str {
        match self {
            DataSeries::Words => "words",
            DataSeries::Names => "names",
            DataSeries::Kanji => "kanji",
            DataSeries::Radicals => "radicals",
        }
    }

    /// Accent color baked into progress-overlay icon names, one per series.
    pub fn accent_color(&self) -> &'static str {
        match self {
            DataSeries::Words => "green",
            DataSeries::Names => "blue",
            DataSeries::Kanji => "purple",
            DataSeries::Radicals => "purple",
        }
    }
}

/// Load state of a single data series.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SeriesLoadState {
    Init,
    Loading,
    Ok,
    Error,
    Unloaded,
}

impl SeriesLoadState {
    pub fn is_ok(&self) -> bool {
        matches!(self, SeriesLoadState::Ok)
    }
}

/// Progress of the background update pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum UpdateProgress {
    Idle,
    Checking {
        series: DataSeries,
    },
    /// `total_progress` is nominally in [0,1] and non-decreasing within one
    /// update cycle; derivation clamps and renders whatever arrives.
    Updating {
        series: DataSeries,
        total_progress: f32,
    },
}

/// Most recent fatal error reported by the load/update pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PipelineError {
    pub name: String,
    #[serde(default)]
    pub message: String,
}

impl PipelineError {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self { name: name.into(), message: message.into() }
    }

    /// Abort is an expected cancellation; quota-exceeded is unactionable by
    /// the user and would nag persistently. Neither earns the error badge.
    pub fn is_suppressed(&self) -> bool {
        matches!(self.name.as_str(), "AbortError" | "QuotaExceededError")
    }
}

/// User-chosen icon skin, applied as an icon-name modifier.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IconStyle {
    #[default]
    Default,
    Alternate,
}

/// Immutable description of overall feature state at a point in time.
///
/// Producers assemble one of these whenever any constituent changes
/// (enablement toggle, per-series load tick, update progress, error) and
/// submit it to the indicator; the latest submitted snapshot always wins.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StateSnapshot {
    pub enabled: bool,
    pub load_state: FxHashMap<DataSeries, SeriesLoadState>,
    /// Fallback series with its own lifecycle; `Unloaded` means it has not
    /// been attempted yet, which is deliberately not treated as broken.
    #[serde(default)]
    pub fallback: Option<SeriesLoadState>,
    pub update_progress: UpdateProgress,
    #[serde(default)]
    pub last_error: Option<PipelineError>,
    #[serde(default)]
    pub style: IconStyle,
    #[serde(default)]
    pub context: Option<ContextId>,
}

impl StateSnapshot {
    /// Snapshot with every series at `Init`, no fallback, idle progress.
    pub fn initial(enabled: bool) -> Self {
        let load_state = DataSeries::ALL
            .iter()
            .map(|s| (*s, SeriesLoadState::Init))
            .collect();
        Self {
            enabled,
            load_state,
            fallback: None,
            update_progress: UpdateProgress::Idle,
            last_error: None,
            style: IconStyle::Default,
            context: None,
        }
    }
}

/// Tooltip arguments in template order.
pub type TooltipArgs = SmallVec<[String; 2]>;

/// Concrete visual outputs for one snapshot; recomputed every cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DerivedVisual {
    /// Dash-joined icon name parts, e.g. `ready-alt-40p-green`.
    pub icon_key: String,
    /// Message-table key; resolution is the host's concern.
    pub tooltip_key: String,
    pub tooltip_args: TooltipArgs,
    pub badge_text: String,
    pub badge_color: Option<String>,
}
