//! Opacity policies: distance fades and visibility crossfades.

use glam::DVec3;
use num_traits::Float;
use serde::Deserialize;

use crate::error::GraphError;
use crate::node::NodeId;

/// Clamped linear interpolation of `x` from `[x0, x1]` to `[y0, y1]`.
///
/// Inputs outside the range return the boundary value exactly. `x0 > x1`
/// maps a decreasing range.
#[inline]
pub fn lint<T: Float>(x: T, x0: T, x1: T, y0: T, y1: T) -> T {
    if x0 == x1 {
        return if x < x0 { y0 } else { y1 };
    }
    let t = (x - x0) / (x1 - x0);
    if t <= T::zero() {
        y0
    } else if t >= T::one() {
        y1
    } else {
        y0 + (y1 - y0) * t
    }
}

/// Linear map from a distance range to an opacity range.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct FadeMap {
    /// Distances in scene units.
    pub range: [f64; 2],
    /// Opacities at `range[0]` and `range[1]`.
    pub opacity: [f64; 2],
}

impl FadeMap {
    pub fn new(range: [f64; 2], opacity: [f64; 2]) -> Self {
        Self { range, opacity }
    }

    #[inline]
    pub fn opacity_at(&self, distance: f64) -> f64 {
        lint(
            distance,
            self.range[0],
            self.range[1],
            self.opacity[0],
            self.opacity[1],
        )
    }

    fn validate(&self, which: &str) -> Result<(), GraphError> {
        if !self.range.iter().all(|d| d.is_finite()) {
            return Err(GraphError::MalformedFade(format!(
                "{which} range {:?} is not finite",
                self.range
            )));
        }
        if !self.opacity.iter().all(|o| (0.0..=1.0).contains(o)) {
            return Err(GraphError::MalformedFade(format!(
                "{which} opacity map {:?} is outside [0, 1]",
                self.opacity
            )));
        }
        Ok(())
    }
}

/// What the fade distance is measured to.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum FadeReference {
    /// The node itself.
    #[default]
    Own,
    /// Another node; its distance to the camera is used as is.
    Node(NodeId),
    /// A fixed point in absolute scene coordinates.
    Point(DVec3),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FadeConfig {
    pub fade_in: Option<FadeMap>,
    pub fade_out: Option<FadeMap>,
    pub reference: FadeReference,
    /// Last evaluated fade distance.
    pub current_distance: f64,
}

impl FadeConfig {
    pub fn is_active(&self) -> bool {
        self.fade_in.is_some() || self.fade_out.is_some()
    }

    /// A fade-in whose near end maps to a positive opacity does not start
    /// from the parent's opacity but from 1.
    pub fn overrides_parent_opacity(&self) -> bool {
        self.fade_in.map_or(false, |map| map.opacity[0] > 0.0)
    }

    pub fn validate(&self) -> Result<(), GraphError> {
        if let Some(map) = &self.fade_in {
            map.validate("fade-in")?;
        }
        if let Some(map) = &self.fade_out {
            map.validate("fade-out")?;
        }
        Ok(())
    }

    /// Multiplies `opacity` by every active map at `distance`.
    pub fn apply(&self, opacity: f32, distance: f64) -> f32 {
        let mut opacity = opacity;
        if let Some(map) = &self.fade_in {
            opacity *= map.opacity_at(distance) as f32;
        }
        if let Some(map) = &self.fade_out {
            opacity *= map.opacity_at(distance) as f32;
        }
        opacity
    }
}

/// Visibility flag with a timed crossfade on every toggle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Visibility {
    visible: bool,
    /// Session time of the last toggle, in milliseconds.
    last_change_ms: Option<i64>,
}

impl Default for Visibility {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Visibility {
    pub fn new(visible: bool) -> Self {
        Self {
            visible,
            last_change_ms: None,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn last_change_ms(&self) -> Option<i64> {
        self.last_change_ms
    }

    /// Sets the flag. Returns whether it changed; only a change restarts the
    /// crossfade.
    pub fn set_visible(&mut self, visible: bool, now_ms: i64) -> bool {
        if self.visible == visible {
            return false;
        }
        self.visible = visible;
        self.last_change_ms = Some(now_ms);
        true
    }

    /// Opacity factor at `now_ms`. Exactly 0 or 1 once `fade_ms` have passed
    /// since the last toggle.
    pub fn opacity_factor(&self, now_ms: i64, fade_ms: i64) -> f32 {
        let target = if self.visible { 1.0 } else { 0.0 };
        let Some(changed) = self.last_change_ms else {
            return target;
        };

        let elapsed = now_ms.saturating_sub(changed);
        if elapsed >= fade_ms {
            return target;
        }

        let fade = lint(elapsed as f32, 0.0, fade_ms as f32, 0.0, 1.0);
        if self.visible {
            fade
        } else {
            1.0 - fade
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lint_clamps_to_exact_bounds() {
        assert_eq!(lint(-5.0, 0.0, 10.0, 0.3, 0.1), 0.3);
        assert_eq!(lint(15.0, 0.0, 10.0, 0.3, 0.1), 0.1);
        assert_eq!(lint(10.0, 0.0, 10.0, 0.3, 0.1), 0.1);
        assert!((lint(5.0, 0.0, 10.0, 0.0, 1.0) - 0.5f64).abs() < 1e-15);
    }

    #[test]
    fn lint_decreasing_range() {
        assert_eq!(lint(20.0, 10.0, 0.0, 1.0, 0.0), 1.0);
        assert!((lint(2.5, 10.0, 0.0, 1.0, 0.0) - 0.25f64).abs() < 1e-15);
    }

    #[test]
    fn fade_in_and_out_make_a_shell() {
        let config = FadeConfig {
            fade_in: Some(FadeMap::new([1.0, 2.0], [0.0, 1.0])),
            fade_out: Some(FadeMap::new([10.0, 20.0], [1.0, 0.0])),
            ..Default::default()
        };
        assert_eq!(config.apply(1.0, 0.5), 0.0);
        assert_eq!(config.apply(1.0, 5.0), 1.0);
        assert_eq!(config.apply(1.0, 25.0), 0.0);
        assert!((config.apply(1.0, 15.0) - 0.5).abs() < 1e-6);
        assert!((config.apply(0.5, 1.5) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn positive_near_opacity_overrides_parent() {
        let mut config = FadeConfig {
            fade_in: Some(FadeMap::new([1.0, 2.0], [0.0, 1.0])),
            ..Default::default()
        };
        assert!(!config.overrides_parent_opacity());
        config.fade_in = Some(FadeMap::new([1.0, 2.0], [0.2, 1.0]));
        assert!(config.overrides_parent_opacity());
    }

    #[test]
    fn malformed_maps_are_rejected() {
        let config = FadeConfig {
            fade_out: Some(FadeMap::new([f64::NAN, 2.0], [1.0, 0.0])),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(GraphError::MalformedFade(_))));

        let config = FadeConfig {
            fade_in: Some(FadeMap::new([0.0, 2.0], [0.0, 1.5])),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn crossfade_turning_off() {
        let mut visibility = Visibility::new(true);
        assert_eq!(visibility.opacity_factor(0, 500), 1.0);

        assert!(visibility.set_visible(false, 1000));
        assert_eq!(visibility.opacity_factor(1000, 500), 1.0);
        assert!((visibility.opacity_factor(1250, 500) - 0.5).abs() < 1e-6);
        assert_eq!(visibility.opacity_factor(1500, 500), 0.0);
        assert_eq!(visibility.opacity_factor(90_000, 500), 0.0);
    }

    #[test]
    fn crossfade_turning_on_is_exact_after_duration() {
        let mut visibility = Visibility::new(false);
        visibility.set_visible(true, 0);
        let mid = visibility.opacity_factor(100, 300);
        assert!(mid > 0.0 && mid < 1.0);
        assert_eq!(visibility.opacity_factor(300, 300), 1.0);
        assert_eq!(visibility.opacity_factor(301, 300), 1.0);
    }

    #[test]
    fn repeated_flag_does_not_restart_fade() {
        let mut visibility = Visibility::new(true);
        assert!(!visibility.set_visible(true, 50));
        assert_eq!(visibility.last_change_ms(), None);
    }

    #[test]
    fn zero_duration_snaps() {
        let mut visibility = Visibility::new(true);
        visibility.set_visible(false, 10);
        assert_eq!(visibility.opacity_factor(10, 0), 0.0);
    }
}
