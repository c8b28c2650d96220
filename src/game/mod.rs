//! The gameplay core of the bubble shooter.
//!
//! This module contains:
//! - Staggered grid layout and the grid model that owns snapped bubbles
//! - Bubble kinds, colors and power bubbles
//! - A small circle/box physics world for bubbles in flight
//! - Snapping on contact and match resolution (specials, clusters, floating)
//! - Score, streaks, the time budget and win/lose evaluation
//! - The cannon, level files, a level designer and best-shot hints
//!
//! Everything except `session`, `hint` and `level` is plain Rust with no
//! Bevy schedule involved.

pub mod bubble;
pub mod cluster;
pub mod collision;
pub mod designer;
pub mod grid;
pub mod hex;
pub mod hint;
pub mod level;
pub mod physics;
pub mod session;
pub mod shooter;
pub mod state;

use bevy::prelude::*;

pub(super) fn plugin(app: &mut App) {
    app.add_plugins((session::plugin, hint::plugin, level::plugin));
}
