//! Bubbles - the main game objects.
//!
//! A bubble is either a colored bubble or a power bubble. Colored bubbles
//! pop in groups of 3+; power bubbles trigger special effects when a colored
//! bubble lands next to them.

use std::sync::atomic::{AtomicU64, Ordering};

use bevy::math::Vec2;
use bevy::reflect::Reflect;
use rand::Rng;
use serde::{Deserialize, Serialize};

static NEXT_BUBBLE_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a bubble instance.
///
/// Two bubbles with the same color are still different bubbles; the physics
/// world and the grid talk about a bubble through this handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Reflect)]
pub struct BubbleId(u64);

impl BubbleId {
    /// Issue a fresh, never-seen-before id.
    pub fn next() -> Self {
        Self(NEXT_BUBBLE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for BubbleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The different bubble colors.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Reflect, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum BubbleColor {
    #[default]
    Red,
    Blue,
    Orange,
    Green,
}

impl BubbleColor {
    /// Get all possible bubble colors.
    pub const ALL: [BubbleColor; 4] = [
        BubbleColor::Red,
        BubbleColor::Blue,
        BubbleColor::Orange,
        BubbleColor::Green,
    ];

    /// Get a random bubble color.
    pub fn random() -> Self {
        Self::random_with(&mut rand::rng())
    }

    /// Get a random bubble color from the given generator, uniform over all colors.
    pub fn random_with(rng: &mut impl Rng) -> Self {
        Self::ALL[rng.random_range(0..Self::ALL.len())]
    }
}

/// The special power a power bubble carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerKind {
    /// Never removed by anything.
    Indestructible,
    /// Clears its whole section.
    Lightning,
    /// Clears itself and its neighbors.
    Bomb,
    /// Clears every bubble of the activating color.
    Star,
}

impl PowerKind {
    pub const ALL: [PowerKind; 4] = [
        PowerKind::Indestructible,
        PowerKind::Lightning,
        PowerKind::Bomb,
        PowerKind::Star,
    ];
}

/// What a bubble is, independent of where it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BubbleKind {
    Colored(BubbleColor),
    Power(PowerKind),
}

impl BubbleKind {
    pub fn color(self) -> Option<BubbleColor> {
        match self {
            BubbleKind::Colored(color) => Some(color),
            BubbleKind::Power(_) => None,
        }
    }

    pub fn power(self) -> Option<PowerKind> {
        match self {
            BubbleKind::Power(power) => Some(power),
            BubbleKind::Colored(_) => None,
        }
    }
}

/// A bubble instance with its physical state.
///
/// While in flight a bubble has nonzero velocity and lives in the physics
/// world. Once snapped, its velocity is zero and it lives in a grid slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Bubble {
    id: BubbleId,
    pub kind: BubbleKind,
    pub center: Vec2,
    pub radius: f32,
    pub velocity: Vec2,
}

impl Bubble {
    /// Create a stationary bubble with a fresh identity.
    pub fn new(kind: BubbleKind, center: Vec2, radius: f32) -> Self {
        Self {
            id: BubbleId::next(),
            kind,
            center,
            radius,
            velocity: Vec2::ZERO,
        }
    }

    pub fn colored(color: BubbleColor, center: Vec2, radius: f32) -> Self {
        Self::new(BubbleKind::Colored(color), center, radius)
    }

    pub fn power(power: PowerKind, center: Vec2, radius: f32) -> Self {
        Self::new(BubbleKind::Power(power), center, radius)
    }

    /// Builder-style velocity, for launching.
    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = velocity;
        self
    }

    #[inline]
    pub fn id(&self) -> BubbleId {
        self.id
    }

    #[inline]
    pub fn color(&self) -> Option<BubbleColor> {
        self.kind.color()
    }

    #[inline]
    pub fn power_kind(&self) -> Option<PowerKind> {
        self.kind.power()
    }

    /// A bubble with nonzero velocity is in flight.
    #[inline]
    pub fn is_moving(&self) -> bool {
        self.velocity != Vec2::ZERO
    }

    pub fn is_indestructible(&self) -> bool {
        self.kind == BubbleKind::Power(PowerKind::Indestructible)
    }

    /// Power bubbles that do something when activated.
    pub fn is_special(&self) -> bool {
        matches!(self.kind, BubbleKind::Power(power) if power != PowerKind::Indestructible)
    }

    /// Same payload under a new identity.
    pub fn duplicate(&self) -> Self {
        Self {
            id: BubbleId::next(),
            ..self.clone()
        }
    }
}
