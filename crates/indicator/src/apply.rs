//! Commits a derived visual to a host surface pair.

#![forbid(unsafe_code)]

use lexibar_core::{ContextId, DerivedVisual};
use lexibar_surface::{MessageLookup, SurfacePair, SurfaceResult};

use crate::limiter::RateLimited;

/// Apply one derived visual: icon and badge go out immediately and are
/// awaited in order; the tooltip is resolved through the message lookup
/// and routed through the rate limiter, because hosts visibly glitch when
/// titles change too frequently.
pub async fn apply_visual(
    surface: &SurfacePair,
    title: &RateLimited<(String, Option<ContextId>)>,
    messages: &dyn MessageLookup,
    visual: &DerivedVisual,
    context: Option<ContextId>,
) -> SurfaceResult<()> {
    surface.set_icon(&visual.icon_key, context).await?;
    surface.set_badge_text(&visual.badge_text, context).await?;
    surface
        .set_badge_background_color(visual.badge_color.as_deref(), context)
        .await?;
    let text = messages.message(&visual.tooltip_key, &visual.tooltip_args);
    title.call((text, context));
    Ok(())
}
