//! Bubble shooter core: a staggered bubble grid, flying bubbles, snapping
//! and match resolution, packaged as a Bevy plugin.

pub mod game;

use bevy::prelude::*;

pub use game::session::{
    BubbleRemoved, FireBubble, GameLost, GameSession, GameWon, SessionConfig, StatsUpdated,
    TimerTicked,
};

/// Adds the game session, hints and level persistence.
///
/// Needs a schedule runner and task pools, e.g. from `MinimalPlugins`.
pub struct BubbleBurstPlugin;

impl Plugin for BubbleBurstPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<Pause>();
        app.configure_sets(
            Update,
            PausableSystems.run_if(resource_equals(Pause(false))),
        );
        app.configure_sets(
            FixedUpdate,
            PausableSystems.run_if(resource_equals(Pause(false))),
        );

        app.add_plugins(game::plugin);
    }
}

/// Whether or not the game is paused.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pause(pub bool);

/// A system set for systems that shouldn't run while the game is paused.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PausableSystems;
