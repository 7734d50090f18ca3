//! Pure derivation of the toolbar visual from a state snapshot.
//!
//! Precedence: enablement dominates the base, then load states, then the
//! style modifier, then the update-progress overlay (never on top of the
//! error base), and finally the badge/error overlay which is computed
//! independently and may override the tooltip.

#![forbid(unsafe_code)]

use smallvec::smallvec;

use crate::{DerivedVisual, IconStyle, SeriesLoadState, StateSnapshot, TooltipArgs, UpdateProgress};

pub const TOOLTIP_READY: &str = "tooltip_ready";
pub const TOOLTIP_LOADING: &str = "tooltip_loading";
pub const TOOLTIP_DISABLED: &str = "tooltip_disabled";
pub const TOOLTIP_LOAD_ERROR: &str = "tooltip_load_error";
pub const TOOLTIP_CHECKING: &str = "tooltip_checking";
pub const TOOLTIP_DOWNLOADING: &str = "tooltip_downloading";
pub const TOOLTIP_UPDATE_ERROR: &str = "tooltip_update_error";

pub const BADGE_ERROR_TEXT: &str = "!";
pub const BADGE_WARNING_COLOR: &str = "yellow";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IconBase {
    Ready,
    Loading,
    Disabled,
    Error,
}

impl IconBase {
    fn part(&self) -> &'static str {
        match self {
            IconBase::Ready => "ready",
            IconBase::Loading => "loading",
            IconBase::Disabled => "disabled",
            IconBase::Error => "error",
        }
    }
}

/// Map a full snapshot to its concrete visual outputs.
///
/// Total over all inputs: out-of-range progress values are clamped, never
/// rejected, so a misbehaving producer degrades the rendering rather than
/// the render loop.
pub fn derive_visual(snap: &StateSnapshot) -> DerivedVisual {
    let (base, mut tooltip_key) = if !snap.enabled {
        (IconBase::Disabled, TOOLTIP_DISABLED)
    } else {
        load_base(snap)
    };
    let mut tooltip_args = TooltipArgs::new();

    let mut icon_key = String::from(base.part());
    // Style modifier rides on the enabled bases only; the disabled icon is
    // a single skin.
    if snap.enabled && snap.style == IconStyle::Alternate {
        icon_key.push_str("-alt");
    }

    // Progress overlay. The error base already says something stronger, so
    // it is never decorated. A disabled icon still shows the overlay, but
    // the tooltip keeps saying "disabled".
    if base != IconBase::Error {
        match &snap.update_progress {
            UpdateProgress::Idle => {}
            UpdateProgress::Checking { series } => {
                // 0% in the series color rather than an indeterminate
                // variant, so a check that turns into a download does not
                // flicker through a third icon.
                icon_key.push_str("-0p-");
                icon_key.push_str(series.accent_color());
                if snap.enabled {
                    tooltip_key = TOOLTIP_CHECKING;
                }
            }
            UpdateProgress::Updating { series, total_progress } => {
                icon_key.push_str(&format!(
                    "-{}p-{}",
                    progress_bucket(*total_progress),
                    series.accent_color()
                ));
                if snap.enabled {
                    tooltip_key = TOOLTIP_DOWNLOADING;
                    tooltip_args = smallvec![
                        series.label().to_string(),
                        percent(*total_progress).to_string(),
                    ];
                }
            }
        }
    }

    // Badge overlay, independent of the tooltip base above.
    let tracked_not_ok = snap.load_state.values().any(|s| !s.is_ok())
        || snap.fallback.map_or(false, |s| !s.is_ok());
    let (badge_text, badge_color) = match &snap.last_error {
        Some(err) if tracked_not_ok && !err.is_suppressed() => {
            tooltip_key = TOOLTIP_UPDATE_ERROR;
            tooltip_args.clear();
            (
                BADGE_ERROR_TEXT.to_string(),
                Some(BADGE_WARNING_COLOR.to_string()),
            )
        }
        _ => (String::new(), None),
    };

    DerivedVisual {
        icon_key,
        tooltip_key: tooltip_key.to_string(),
        tooltip_args,
        badge_text,
        badge_color,
    }
}

fn load_base(snap: &StateSnapshot) -> (IconBase, &'static str) {
    let fallback_is = |s: SeriesLoadState| snap.fallback == Some(s);
    if snap.load_state.values().any(|s| s.is_ok()) || fallback_is(SeriesLoadState::Ok) {
        return (IconBase::Ready, TOOLTIP_READY);
    }
    let still_loading = snap
        .load_state
        .values()
        .any(|s| matches!(s, SeriesLoadState::Init | SeriesLoadState::Loading))
        || fallback_is(SeriesLoadState::Loading);
    if still_loading {
        return (IconBase::Loading, TOOLTIP_LOADING);
    }
    // An unattempted fallback is not broken; render ready until it is tried.
    if fallback_is(SeriesLoadState::Unloaded) {
        return (IconBase::Ready, TOOLTIP_READY);
    }
    (IconBase::Error, TOOLTIP_LOAD_ERROR)
}

/// Quantize [0,1] progress into six buckets (0, 20, .. 100).
fn progress_bucket(p: f32) -> u32 {
    ((p.clamp(0.0, 1.0) * 5.0).round() as u32) * 20
}

fn percent(p: f32) -> u32 {
    (p.clamp(0.0, 1.0) * 100.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DataSeries, PipelineError};

    fn snap(enabled: bool, state: SeriesLoadState) -> StateSnapshot {
        let mut s = StateSnapshot::initial(enabled);
        for series in DataSeries::ALL {
            s.load_state.insert(series, state);
        }
        s
    }

    #[test]
    fn ready_when_any_series_ok() {
        let mut s = snap(true, SeriesLoadState::Init);
        s.load_state.insert(DataSeries::Words, SeriesLoadState::Ok);
        let v = derive_visual(&s);
        assert_eq!(v.icon_key, "ready");
        assert_eq!(v.tooltip_key, TOOLTIP_READY);
        assert_eq!(v.badge_text, "");
        assert!(v.badge_color.is_none());
    }

    #[test]
    fn loading_while_series_init() {
        let v = derive_visual(&snap(true, SeriesLoadState::Init));
        assert_eq!(v.icon_key, "loading");
        assert_eq!(v.tooltip_key, TOOLTIP_LOADING);
    }

    #[test]
    fn loading_fallback_keeps_loading_base() {
        let mut s = snap(true, SeriesLoadState::Error);
        s.fallback = Some(SeriesLoadState::Loading);
        let v = derive_visual(&s);
        assert_eq!(v.icon_key, "loading");
    }

    #[test]
    fn unattempted_fallback_renders_ready() {
        // All primaries failed but the fallback was never tried: optimistic.
        let mut s = snap(true, SeriesLoadState::Error);
        s.fallback = Some(SeriesLoadState::Unloaded);
        let v = derive_visual(&s);
        assert_eq!(v.icon_key, "ready");
        assert_eq!(v.tooltip_key, TOOLTIP_READY);
    }

    #[test]
    fn error_base_when_everything_failed() {
        let v = derive_visual(&snap(true, SeriesLoadState::Error));
        assert_eq!(v.icon_key, "error");
        assert_eq!(v.tooltip_key, TOOLTIP_LOAD_ERROR);
    }

    #[test]
    fn disabled_dominates_progress_tooltip() {
        let mut s = snap(false, SeriesLoadState::Ok);
        s.update_progress = UpdateProgress::Updating {
            series: DataSeries::Words,
            total_progress: 0.5,
        };
        let v = derive_visual(&s);
        assert!(v.icon_key.starts_with("disabled"), "got {}", v.icon_key);
        // The overlay still shows on the icon, never on the tooltip.
        assert!(v.icon_key.ends_with("-60p-green"), "got {}", v.icon_key);
        assert_eq!(v.tooltip_key, TOOLTIP_DISABLED);
        assert!(v.tooltip_args.is_empty());
    }

    #[test]
    fn alternate_style_appends_modifier() {
        let mut s = snap(true, SeriesLoadState::Ok);
        s.style = IconStyle::Alternate;
        let v = derive_visual(&s);
        assert_eq!(v.icon_key, "ready-alt");
    }

    #[test]
    fn updating_buckets_progress_and_colors_by_series() {
        let mut s = snap(true, SeriesLoadState::Ok);
        s.update_progress = UpdateProgress::Updating {
            series: DataSeries::Words,
            total_progress: 0.43,
        };
        let v = derive_visual(&s);
        assert_eq!(v.icon_key, "ready-40p-green");
        assert_eq!(v.tooltip_key, TOOLTIP_DOWNLOADING);
        assert_eq!(v.tooltip_args.to_vec(), vec!["words".to_string(), "43".to_string()]);
    }

    #[test]
    fn checking_shows_zero_bucket() {
        let mut s = snap(true, SeriesLoadState::Ok);
        s.update_progress = UpdateProgress::Checking { series: DataSeries::Names };
        let v = derive_visual(&s);
        assert_eq!(v.icon_key, "ready-0p-blue");
        assert_eq!(v.tooltip_key, TOOLTIP_CHECKING);
    }

    #[test]
    fn error_base_suppresses_progress_overlay() {
        let mut s = snap(true, SeriesLoadState::Error);
        s.update_progress = UpdateProgress::Updating {
            series: DataSeries::Kanji,
            total_progress: 0.9,
        };
        let v = derive_visual(&s);
        assert_eq!(v.icon_key, "error");
    }

    #[test]
    fn out_of_range_progress_is_clamped() {
        let mut s = snap(true, SeriesLoadState::Ok);
        s.update_progress = UpdateProgress::Updating {
            series: DataSeries::Words,
            total_progress: 7.5,
        };
        let v = derive_visual(&s);
        assert_eq!(v.icon_key, "ready-100p-green");
        assert_eq!(v.tooltip_args[1], "100");
    }

    #[test]
    fn badge_surfaces_real_errors() {
        let mut s = snap(true, SeriesLoadState::Init);
        s.last_error = Some(PipelineError::new("NetworkError", "offline"));
        let v = derive_visual(&s);
        assert_eq!(v.badge_text, BADGE_ERROR_TEXT);
        assert_eq!(v.badge_color.as_deref(), Some(BADGE_WARNING_COLOR));
        assert_eq!(v.tooltip_key, TOOLTIP_UPDATE_ERROR);
    }

    #[test]
    fn badge_suppressed_for_quota_and_abort() {
        for name in ["QuotaExceededError", "AbortError"] {
            let mut s = snap(true, SeriesLoadState::Error);
            s.last_error = Some(PipelineError::new(name, ""));
            let v = derive_visual(&s);
            assert_eq!(v.badge_text, "", "{} must not badge", name);
            assert!(v.badge_color.is_none());
            assert_ne!(v.tooltip_key, TOOLTIP_UPDATE_ERROR);
        }
    }

    #[test]
    fn badge_needs_a_struggling_series() {
        let mut s = snap(true, SeriesLoadState::Ok);
        s.fallback = Some(SeriesLoadState::Ok);
        s.last_error = Some(PipelineError::new("NetworkError", "offline"));
        let v = derive_visual(&s);
        assert_eq!(v.badge_text, "");
        assert!(v.badge_color.is_none());
        assert_eq!(v.tooltip_key, TOOLTIP_READY);
    }

    #[test]
    fn badge_overrides_disabled_tooltip() {
        let mut s = snap(false, SeriesLoadState::Init);
        s.last_error = Some(PipelineError::new("NetworkError", "offline"));
        let v = derive_visual(&s);
        assert!(v.icon_key.starts_with("disabled"));
        assert_eq!(v.badge_text, BADGE_ERROR_TEXT);
        assert_eq!(v.tooltip_key, TOOLTIP_UPDATE_ERROR);
    }

    #[test]
    fn derivation_is_deterministic() {
        let mut s = snap(true, SeriesLoadState::Ok);
        s.update_progress = UpdateProgress::Updating {
            series: DataSeries::Radicals,
            total_progress: 0.2,
        };
        assert_eq!(derive_visual(&s), derive_visual(&s));
    }

    #[test]
    fn bucket_edges() {
        assert_eq!(progress_bucket(0.0), 0);
        assert_eq!(progress_bucket(0.09), 0);
        assert_eq!(progress_bucket(0.1), 20);
        assert_eq!(progress_bucket(0.43), 40);
        assert_eq!(progress_bucket(0.5), 60);
        assert_eq!(progress_bucket(1.0), 100);
    }
}
