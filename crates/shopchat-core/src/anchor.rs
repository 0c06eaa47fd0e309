//! Anchor offset computation for the floating widget.
//!
//! Computes the `{bottom, right}` screen offsets that position the widget,
//! under one of two policies chosen at mount and never changed afterwards:
//! fixed (constants per viewport breakpoint) or floating (tracks a reference
//! element elsewhere on the page, e.g. the login control).
//!
//! The computation is total and idempotent: same inputs, same offsets, and it
//! never panics. Implausible numeric results are replaced with a documented
//! fallback and logged.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Upper bound (exclusive) of the narrow breakpoint, px.
pub const NARROW_MAX_WIDTH: f64 = 768.0;
/// Upper bound (exclusive) of the medium breakpoint, px.
pub const MEDIUM_MAX_WIDTH: f64 = 1024.0;

/// Horizontal inset from the viewport's right edge, per breakpoint.
const RIGHT_NARROW: f64 = 16.0;
const RIGHT_MEDIUM: f64 = 24.0;
const RIGHT_WIDE: f64 = 32.0;

/// Vertical inset from the viewport's bottom edge (fixed policy, and the
/// fallback when a floating computation goes numerically bad).
const BOTTOM_BASE: f64 = 24.0;

/// Gap kept between the widget and the reference element (floating policy).
const REFERENCE_GAP: f64 = 12.0;

/// Clamp range for the floating `bottom`, per breakpoint.
const FLOAT_CLAMP_NARROW: (f64, f64) = (16.0, 96.0);
const FLOAT_CLAMP_MEDIUM: (f64, f64) = (24.0, 120.0);
const FLOAT_CLAMP_WIDE: (f64, f64) = (32.0, 160.0);

/// Static floating `bottom` when no reference element can be located.
const FLOAT_DEFAULT_NARROW: f64 = 72.0;
const FLOAT_DEFAULT_MEDIUM: f64 = 88.0;
const FLOAT_DEFAULT_WIDE: f64 = 96.0;

/// Responsive width class of the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Breakpoint {
    Narrow,
    Medium,
    Wide,
}

impl Breakpoint {
    pub fn from_width(width: f64) -> Self {
        if width < NARROW_MAX_WIDTH {
            Breakpoint::Narrow
        } else if width < MEDIUM_MAX_WIDTH {
            Breakpoint::Medium
        } else {
            Breakpoint::Wide
        }
    }
}

/// Viewport geometry as reported by the host.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    /// Platform safe-area inset at the bottom edge (notched devices).
    pub safe_area_bottom: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            safe_area_bottom: 0.0,
        }
    }

    pub fn breakpoint(&self) -> Breakpoint {
        Breakpoint::from_width(self.width)
    }
}

/// Measured rectangle of a page element, in viewport coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ElementRect {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

impl ElementRect {
    pub fn new(top: f64, left: f64, width: f64, height: f64) -> Self {
        Self {
            top,
            left,
            width,
            height,
        }
    }

    /// Bottom edge in viewport coordinates.
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

/// Computed screen offsets for the widget, from the viewport's bottom-right.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AnchorOffsets {
    pub bottom: f64,
    pub right: f64,
}

/// Positioning policy, selected once at mount.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorPolicy {
    /// Breakpoint constants only; no dependency on any page element.
    Fixed,
    /// Track the reference element, clamped; static defaults when missing.
    #[default]
    Floating,
}

/// Compute the widget anchor.
pub fn compute_anchor(
    policy: AnchorPolicy,
    viewport: &Viewport,
    reference: Option<&ElementRect>,
) -> AnchorOffsets {
    let breakpoint = viewport.breakpoint();
    let right = match breakpoint {
        Breakpoint::Narrow => RIGHT_NARROW,
        Breakpoint::Medium => RIGHT_MEDIUM,
        Breakpoint::Wide => RIGHT_WIDE,
    };

    let bottom = match policy {
        AnchorPolicy::Fixed => fixed_bottom(breakpoint, viewport),
        AnchorPolicy::Floating => match reference {
            Some(rect) => {
                let raw = viewport.height - rect.bottom() + REFERENCE_GAP;
                let (min, max) = match breakpoint {
                    Breakpoint::Narrow => FLOAT_CLAMP_NARROW,
                    Breakpoint::Medium => FLOAT_CLAMP_MEDIUM,
                    Breakpoint::Wide => FLOAT_CLAMP_WIDE,
                };
                raw.clamp(min, max)
            }
            None => match breakpoint {
                Breakpoint::Narrow => FLOAT_DEFAULT_NARROW,
                Breakpoint::Medium => FLOAT_DEFAULT_MEDIUM,
                Breakpoint::Wide => FLOAT_DEFAULT_WIDE,
            },
        },
    };

    AnchorOffsets {
        bottom: sanitize(bottom),
        right,
    }
}

/// Fixed-policy bottom: one base constant, safe-area added on the two
/// narrower breakpoints.
fn fixed_bottom(breakpoint: Breakpoint, viewport: &Viewport) -> f64 {
    match breakpoint {
        Breakpoint::Narrow | Breakpoint::Medium => BOTTOM_BASE + viewport.safe_area_bottom,
        Breakpoint::Wide => BOTTOM_BASE,
    }
}

/// Replace a non-finite result with the documented fallback.
fn sanitize(bottom: f64) -> f64 {
    if bottom.is_finite() {
        bottom
    } else {
        warn!(
            target: "shopchat::anchor",
            "Computed anchor bottom was {}; falling back to {}",
            bottom,
            BOTTOM_BASE
        );
        BOTTOM_BASE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_policy_breakpoints() {
        let narrow = compute_anchor(AnchorPolicy::Fixed, &Viewport::new(400.0, 800.0), None);
        let medium = compute_anchor(AnchorPolicy::Fixed, &Viewport::new(900.0, 800.0), None);
        let wide = compute_anchor(AnchorPolicy::Fixed, &Viewport::new(1300.0, 800.0), None);

        assert_eq!(narrow.right, RIGHT_NARROW);
        assert_eq!(medium.right, RIGHT_MEDIUM);
        assert_eq!(wide.right, RIGHT_WIDE);

        // Bottom constant identical across all three (no safe-area inset)
        assert_eq!(narrow.bottom, BOTTOM_BASE);
        assert_eq!(medium.bottom, BOTTOM_BASE);
        assert_eq!(wide.bottom, BOTTOM_BASE);
    }

    #[test]
    fn test_breakpoint_boundaries() {
        assert_eq!(Breakpoint::from_width(767.9), Breakpoint::Narrow);
        assert_eq!(Breakpoint::from_width(768.0), Breakpoint::Medium);
        assert_eq!(Breakpoint::from_width(1023.9), Breakpoint::Medium);
        assert_eq!(Breakpoint::from_width(1024.0), Breakpoint::Wide);
    }

    #[test]
    fn test_safe_area_applies_to_narrower_breakpoints_only() {
        let mut viewport = Viewport::new(400.0, 800.0);
        viewport.safe_area_bottom = 34.0;
        assert_eq!(
            compute_anchor(AnchorPolicy::Fixed, &viewport, None).bottom,
            BOTTOM_BASE + 34.0
        );

        viewport.width = 900.0;
        assert_eq!(
            compute_anchor(AnchorPolicy::Fixed, &viewport, None).bottom,
            BOTTOM_BASE + 34.0
        );

        viewport.width = 1300.0;
        assert_eq!(
            compute_anchor(AnchorPolicy::Fixed, &viewport, None).bottom,
            BOTTOM_BASE
        );
    }

    #[test]
    fn test_floating_tracks_reference() {
        let viewport = Viewport::new(1300.0, 900.0);
        // Reference sits with its bottom edge at y=850
        let reference = ElementRect::new(810.0, 1200.0, 80.0, 40.0);

        let offsets = compute_anchor(AnchorPolicy::Floating, &viewport, Some(&reference));
        // 900 - 850 + 12 = 62, inside the wide clamp range
        assert_eq!(offsets.bottom, 62.0);
        assert_eq!(offsets.right, RIGHT_WIDE);
    }

    #[test]
    fn test_floating_clamps_to_range() {
        let viewport = Viewport::new(1300.0, 900.0);

        // Reference at the very bottom: raw would be 12, below the wide min
        let low = ElementRect::new(860.0, 0.0, 80.0, 40.0);
        assert_eq!(
            compute_anchor(AnchorPolicy::Floating, &viewport, Some(&low)).bottom,
            FLOAT_CLAMP_WIDE.0
        );

        // Reference near the top: raw far above the wide max
        let high = ElementRect::new(10.0, 0.0, 80.0, 40.0);
        assert_eq!(
            compute_anchor(AnchorPolicy::Floating, &viewport, Some(&high)).bottom,
            FLOAT_CLAMP_WIDE.1
        );
    }

    #[test]
    fn test_floating_fallback_on_missing_reference() {
        for (width, expected) in [
            (400.0, FLOAT_DEFAULT_NARROW),
            (900.0, FLOAT_DEFAULT_MEDIUM),
            (1300.0, FLOAT_DEFAULT_WIDE),
        ] {
            let offsets =
                compute_anchor(AnchorPolicy::Floating, &Viewport::new(width, 800.0), None);
            assert_eq!(offsets.bottom, expected);
            assert!(offsets.bottom.is_finite());
            assert!(offsets.right.is_finite());
        }
    }

    #[test]
    fn test_non_finite_input_falls_back() {
        let viewport = Viewport {
            width: 1300.0,
            height: f64::NAN,
            safe_area_bottom: 0.0,
        };
        let reference = ElementRect::new(10.0, 0.0, 80.0, 40.0);

        let offsets = compute_anchor(AnchorPolicy::Floating, &viewport, Some(&reference));
        assert_eq!(offsets.bottom, BOTTOM_BASE);
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let viewport = Viewport::new(900.0, 820.0);
        let reference = ElementRect::new(700.0, 800.0, 90.0, 44.0);

        let first = compute_anchor(AnchorPolicy::Floating, &viewport, Some(&reference));
        let second = compute_anchor(AnchorPolicy::Floating, &viewport, Some(&reference));
        assert_eq!(first, second);

        let first = compute_anchor(AnchorPolicy::Fixed, &viewport, None);
        let second = compute_anchor(AnchorPolicy::Fixed, &viewport, None);
        assert_eq!(first, second);
    }
}
