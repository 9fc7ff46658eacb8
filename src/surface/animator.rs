//! Show/hide animation
//!
//! Frame driven state machine sliding the keyboard surface in and out
//! through its bottom margin. Two steady states (`Shown`, `Hidden`) and one
//! transient state while a fold or unfold is in flight.
//!
//! Exclusive zone handling avoids compositor flicker:
//! - unfold: reserve the full height only once the surface is fully visible
//! - fold: release the zone on the first frame

use log::debug;
use std::time::Duration;

use super::easing::{ease_out_cubic, reverse_ease_out_cubic};
use crate::constants::{ANIMATION_STEP, REFERENCE_FRAME_US};

/// Monotonic frame time (arbitrary origin)
pub type Timestamp = Duration;

/// Animation direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Show,
    Hide,
}

/// Externally visible animator state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Visibility {
    Shown,
    Hidden,
    Animating { direction: Direction, progress: f64 },
}

/// Raw animation state
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct AnimationState {
    pub direction: Direction,
    /// Progress towards `direction`, in [0, 1]
    pub progress: f64,
    pub last_frame_time: Option<Timestamp>,
}

/// Surface changes produced by one animation frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickResult {
    /// Map the surface before applying the margin
    pub show_surface: bool,
    /// Bottom margin (negative while partially off screen)
    pub margin: i32,
    /// New exclusive zone, if it changes on this frame
    pub exclusive_zone: Option<i32>,
    /// Unmap the surface (fold completed)
    pub hide_surface: bool,
    /// A steady state was reached, frames are no longer needed
    pub finished: bool,
}

/// Visibility animation state machine
#[derive(Debug)]
pub struct VisibilityAnimator {
    state: AnimationState,
    /// Frame subscription active
    animating: bool,
    /// Configured surface height
    height: i32,
    surface_mapped: bool,
}

impl VisibilityAnimator {
    /// Create an animator in the steady `Hidden` state
    pub fn new(height: i32) -> Self {
        Self {
            state: AnimationState {
                direction: Direction::Hide,
                progress: 1.0,
                last_frame_time: None,
            },
            animating: false,
            height,
            surface_mapped: false,
        }
    }

    pub fn progress(&self) -> f64 {
        self.state.progress
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn set_height(&mut self, height: i32) {
        self.height = height.max(0);
    }

    /// Frame ticks are needed
    pub fn is_animating(&self) -> bool {
        self.animating
    }

    /// Visibility the animator is heading to (or resting at)
    pub fn target_visible(&self) -> bool {
        self.state.direction == Direction::Show
    }

    pub fn visibility(&self) -> Visibility {
        match (self.animating, self.state.direction) {
            (true, direction) => Visibility::Animating {
                direction,
                progress: self.state.progress,
            },
            (false, Direction::Show) => Visibility::Shown,
            (false, Direction::Hide) => Visibility::Hidden,
        }
    }

    /// Request the surface to become visible or hidden
    ///
    /// A request reversing an in-flight animation continues from the current
    /// visual offset instead of restarting. Returns true when a frame
    /// subscription has to be registered, false when one is already running
    /// or the request is a no-op.
    pub fn request_visible(&mut self, visible: bool) -> bool {
        if visible == self.target_visible() {
            return false;
        }

        let old = self.state.progress;
        self.state.direction = if visible { Direction::Show } else { Direction::Hide };
        self.state.progress = reverse_ease_out_cubic(1.0 - ease_out_cubic(old)).clamp(0.0, 1.0);
        self.state.last_frame_time = None;

        debug!(
            "Animate {:?}: progress {:.3} -> {:.3}",
            self.state.direction, old, self.state.progress
        );

        let start = !self.animating;
        self.animating = true;
        start
    }

    /// Advance the animation to frame time `now`
    ///
    /// Returns `None` when no animation is in flight.
    pub fn tick(&mut self, now: Timestamp) -> Option<TickResult> {
        if !self.animating {
            return None;
        }

        // First frame after a request: stale timestamps must not cause a jump
        let first_frame = self.state.last_frame_time.is_none();
        let elapsed = match self.state.last_frame_time {
            Some(last) => now.saturating_sub(last),
            None => Duration::ZERO,
        };
        self.state.progress += ANIMATION_STEP * elapsed.as_micros() as f64 / REFERENCE_FRAME_US;
        self.state.last_frame_time = Some(now);

        let mut result = TickResult::default();

        if self.state.progress >= 1.0 {
            self.state.progress = 1.0;
            self.animating = false;
            result.finished = true;
        }

        let eased = ease_out_cubic(self.state.progress);
        let offset = match self.state.direction {
            Direction::Show => 1.0 - eased,
            Direction::Hide => eased,
        };
        result.margin = (-(self.height as f64) * offset) as i32;

        match self.state.direction {
            Direction::Show => {
                if !self.surface_mapped {
                    self.surface_mapped = true;
                    result.show_surface = true;
                }
                if result.finished {
                    result.exclusive_zone = Some(self.height);
                }
            }
            Direction::Hide => {
                if first_frame {
                    result.exclusive_zone = Some(0);
                }
                if result.finished {
                    self.surface_mapped = false;
                    result.hide_surface = true;
                }
            }
        }

        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Timestamp {
        Duration::from_millis(v)
    }

    /// Tick every 16ms from `start` until finished, collecting results
    fn run(anim: &mut VisibilityAnimator, start: u64) -> Vec<TickResult> {
        let mut results = Vec::new();
        let mut t = start;
        while let Some(r) = anim.tick(ms(t)) {
            results.push(r);
            t += 16;
            assert!(results.len() < 1000, "animation never finished");
        }
        results
    }

    #[test]
    fn test_starts_hidden() {
        let anim = VisibilityAnimator::new(200);
        assert_eq!(anim.visibility(), Visibility::Hidden);
        assert!(!anim.is_animating());
    }

    #[test]
    fn test_request_same_state_is_noop() {
        let mut anim = VisibilityAnimator::new(200);
        assert!(!anim.request_visible(false));
        assert!(anim.tick(ms(0)).is_none());
        assert!(anim.request_visible(true));
        // Already heading to shown: no second subscription
        assert!(!anim.request_visible(true));
    }

    #[test]
    fn test_show_cycle() {
        let mut anim = VisibilityAnimator::new(200);
        assert!(anim.request_visible(true));
        assert!(anim.progress().abs() < 1e-9);

        let results = run(&mut anim, 5000);
        let first = results[0];
        assert!(first.show_surface);
        assert_eq!(first.margin, -200);
        assert_eq!(first.exclusive_zone, None);

        let zones: Vec<_> = results.iter().filter_map(|r| r.exclusive_zone).collect();
        assert_eq!(zones, vec![200]);

        let last = results.last().unwrap();
        assert!(last.finished);
        assert_eq!(last.margin, 0);
        assert_eq!(last.exclusive_zone, Some(200));
        assert_eq!(results.iter().filter(|r| r.show_surface).count(), 1);
        assert_eq!(anim.visibility(), Visibility::Shown);
    }

    #[test]
    fn test_hide_cycle() {
        let mut anim = VisibilityAnimator::new(100);
        anim.request_visible(true);
        run(&mut anim, 0);

        assert!(anim.request_visible(false));
        let results = run(&mut anim, 1000);
        assert_eq!(results[0].exclusive_zone, Some(0));
        assert_eq!(results[0].margin, 0);
        assert!(results[1..].iter().all(|r| r.exclusive_zone.is_none()));

        let last = results.last().unwrap();
        assert!(last.hide_surface);
        assert_eq!(last.margin, -100);
        assert_eq!(anim.visibility(), Visibility::Hidden);
    }

    #[test]
    fn test_progress_monotonic_and_saturates() {
        let mut anim = VisibilityAnimator::new(200);
        anim.request_visible(true);
        let mut last = anim.progress();
        for t in [0u64, 3, 3, 40, 41, 90, 200, 1000, 1000, 5000] {
            anim.tick(ms(t));
            assert!(anim.progress() >= last);
            assert!(anim.progress() <= 1.0);
            last = anim.progress();
        }
        assert!((anim.progress() - 1.0).abs() < 1e-9);
        assert!(!anim.is_animating());
    }

    #[test]
    fn test_first_tick_ignores_stale_time() {
        let mut anim = VisibilityAnimator::new(200);
        anim.request_visible(true);
        anim.tick(ms(1_000_000));
        assert!(anim.progress().abs() < 1e-9);
        anim.tick(ms(1_000_016));
        assert!(anim.progress() > 0.0 && anim.progress() < 0.1);
    }

    #[test]
    fn test_full_animation_takes_quarter_second() {
        let mut anim = VisibilityAnimator::new(200);
        anim.request_visible(true);
        anim.tick(ms(0));
        anim.tick(ms(200));
        assert!(anim.is_animating());
        anim.tick(ms(251));
        assert!(!anim.is_animating());
    }

    #[test]
    fn test_reversal_continues_smoothly() {
        let mut anim = VisibilityAnimator::new(200);
        anim.request_visible(true);
        anim.tick(ms(0));
        anim.tick(ms(100));
        let old = anim.progress();
        assert!((old - 0.4).abs() < 0.01);

        // Reversal keeps the running subscription
        assert!(!anim.request_visible(false));
        let new = anim.progress();
        assert!(new > 0.0 && new <= 1.0);
        assert!((new - 0.078).abs() < 0.005);

        // Same visual offset before and after the reversal
        let before = 1.0 - ease_out_cubic(old);
        let after = ease_out_cubic(new);
        assert!((before - after).abs() < 1e-9);
        assert_eq!(
            anim.visibility(),
            Visibility::Animating {
                direction: Direction::Hide,
                progress: new
            }
        );
    }

    #[test]
    fn test_show_after_reversed_hide_reserves_zone_once() {
        let mut anim = VisibilityAnimator::new(200);
        anim.request_visible(true);
        run(&mut anim, 0);
        anim.request_visible(false);
        anim.tick(ms(1000));
        anim.tick(ms(1050));
        anim.request_visible(true);

        let results = run(&mut anim, 1100);
        // Surface still mapped: no second map request
        assert!(results.iter().all(|r| !r.show_surface));
        let zones: Vec<_> = results.iter().filter_map(|r| r.exclusive_zone).collect();
        assert_eq!(zones, vec![200]);
    }
}
