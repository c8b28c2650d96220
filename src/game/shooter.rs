//! The cannon at the bottom of the play field.
//!
//! The cannon always has a "loaded" bubble ready to fire and a "next"
//! bubble preview. Colors are drawn uniformly from the four bubble colors.

use bevy::log::{debug, info};
use bevy::math::Vec2;
use rand::{SeedableRng, rngs::StdRng};

use super::{
    bubble::{Bubble, BubbleColor},
    hex::GridLayout,
    state::TimeBudget,
};

/// Maximum angle from vertical (in radians) - prevents shooting too horizontally.
pub const MAX_AIM_ANGLE: f32 = 1.3; // About 75 degrees

/// Default bubble speed in play-field units per fixed tick.
pub const DEFAULT_SHOT_SPEED: f32 = 8.0;

/// The launcher.
#[derive(Debug)]
pub struct Cannon {
    pub origin: Vec2,
    pub speed: f32,
    pub radius: f32,
    loaded: BubbleColor,
    next: BubbleColor,
    rng: StdRng,
}

impl Cannon {
    /// A cannon centered under the field, two cells below the last section.
    pub fn new(layout: &GridLayout, speed: f32) -> Self {
        Self::with_rng(layout, speed, StdRng::from_rng(&mut rand::rng()))
    }

    /// Deterministic cannon for replays and tests.
    pub fn seeded(layout: &GridLayout, speed: f32, seed: u64) -> Self {
        Self::with_rng(layout, speed, StdRng::seed_from_u64(seed))
    }

    fn with_rng(layout: &GridLayout, speed: f32, mut rng: StdRng) -> Self {
        let loaded = BubbleColor::random_with(&mut rng);
        let next = BubbleColor::random_with(&mut rng);
        let mut cannon = Self {
            origin: Vec2::ZERO,
            speed,
            radius: 0.0,
            loaded,
            next,
            rng,
        };
        cannon.fit_to(layout);
        cannon
    }

    /// Move under a (possibly different) grid and match its bubble size.
    pub fn fit_to(&mut self, layout: &GridLayout) {
        self.origin = Vec2::new(
            layout.field_width() * 0.5,
            layout.field_height() + layout.cell_diameter * 2.0,
        );
        self.radius = layout.bubble_radius();
    }

    pub fn loaded(&self) -> BubbleColor {
        self.loaded
    }

    pub fn next(&self) -> BubbleColor {
        self.next
    }

    /// Replace the loaded color, e.g. when a level designer or test wants a
    /// specific shot.
    pub fn load(&mut self, color: BubbleColor) {
        self.loaded = color;
    }

    /// Swap the loaded and next bubbles.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.loaded, &mut self.next);
    }

    /// Firing is only allowed while there is time left.
    pub fn can_fire(&self, time: &TimeBudget) -> bool {
        !time.is_exhausted()
    }

    /// Clamp a direction to the allowed aiming cone, always pointing up.
    ///
    /// Returns `None` for a zero direction.
    pub fn aim(direction: Vec2) -> Option<Vec2> {
        let direction = direction.try_normalize()?;
        // Up is -y in play-field space.
        let angle = direction.x.atan2(-direction.y);
        let clamped = angle.clamp(-MAX_AIM_ANGLE, MAX_AIM_ANGLE);
        Some(Vec2::new(clamped.sin(), -clamped.cos()))
    }

    /// Launch the loaded bubble toward `direction` and reload.
    pub fn fire(&mut self, direction: Vec2, time: &TimeBudget) -> Option<Bubble> {
        if !self.can_fire(time) {
            debug!("Cannon is out of time, not firing");
            return None;
        }
        let direction = Self::aim(direction)?;

        let bubble = Bubble::colored(self.loaded, self.origin, self.radius)
            .with_velocity(direction * self.speed);
        info!(
            "Fired {:?} bubble {} with velocity {:?}",
            self.loaded,
            bubble.id(),
            bubble.velocity
        );

        self.loaded = self.next;
        self.next = BubbleColor::random_with(&mut self.rng);
        Some(bubble)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aim_points_up_and_clamps() {
        let up = Cannon::aim(Vec2::new(0.0, -5.0)).unwrap();
        assert!((up - Vec2::new(0.0, -1.0)).length() < 1e-5);

        let flat = Cannon::aim(Vec2::new(1.0, 0.0)).unwrap();
        let angle = flat.x.atan2(-flat.y);
        assert!((angle - MAX_AIM_ANGLE).abs() < 1e-5);

        // Downward shots are folded into the cone.
        let down = Cannon::aim(Vec2::new(-0.1, 1.0)).unwrap();
        assert!(down.y < 0.0);

        assert!(Cannon::aim(Vec2::ZERO).is_none());
    }

    #[test]
    fn test_fire_reloads_from_next() {
        let layout = GridLayout::default();
        let mut cannon = Cannon::seeded(&layout, DEFAULT_SHOT_SPEED, 42);
        let (loaded, next) = (cannon.loaded(), cannon.next());

        let bubble = cannon.fire(Vec2::new(0.0, -1.0), &TimeBudget::new(10)).unwrap();
        assert_eq!(bubble.color(), Some(loaded));
        assert_eq!(bubble.center, cannon.origin);
        assert!((bubble.velocity.length() - DEFAULT_SHOT_SPEED).abs() < 1e-4);
        assert_eq!(cannon.loaded(), next);
    }

    #[test]
    fn test_no_firing_without_time() {
        let layout = GridLayout::default();
        let mut cannon = Cannon::seeded(&layout, DEFAULT_SHOT_SPEED, 1);
        let time = TimeBudget::new(0);
        assert!(!cannon.can_fire(&time));
        assert!(cannon.fire(Vec2::new(0.0, -1.0), &time).is_none());
    }

    #[test]
    fn test_seeded_cannons_agree() {
        let layout = GridLayout::default();
        let mut a = Cannon::seeded(&layout, DEFAULT_SHOT_SPEED, 9);
        let mut b = Cannon::seeded(&layout, DEFAULT_SHOT_SPEED, 9);
        let time = TimeBudget::new(10);
        for _ in 0..10 {
            let shot_a = a.fire(Vec2::new(0.2, -1.0), &time).unwrap();
            let shot_b = b.fire(Vec2::new(0.2, -1.0), &time).unwrap();
            assert_eq!(shot_a.kind, shot_b.kind);
        }
    }
}
