//! Headless autoplay: fills a grid (or loads a saved level named on the
//! command line), then keeps firing at whatever the hint search suggests
//! until the game is won or lost.

use bevy::{log::LogPlugin, prelude::*};

use bubble_burst::{
    BubbleBurstPlugin, FireBubble, GameLost, GameSession, GameWon, StatsUpdated,
    game::{
        grid::GridModel,
        hint::{HintReady, PendingHint, RequestHint},
        level::LoadLevel,
    },
};

/// Sections filled with random bubbles when no level is given.
const AUTOPLAY_SECTIONS: usize = 4;

fn main() -> AppExit {
    App::new()
        .add_plugins((MinimalPlugins, LogPlugin::default()))
        .add_plugins(BubbleBurstPlugin)
        .add_systems(Startup, setup_level)
        .add_systems(Update, (autoplay, log_stats, exit_when_over))
        .run()
}

fn setup_level(mut session: ResMut<GameSession>, mut load: MessageWriter<LoadLevel>) {
    if let Some(name) = std::env::args().nth(1) {
        info!("Autoplay loading level {:?}", name);
        load.write(LoadLevel { name });
        return;
    }

    let mut grid = GridModel::new(session.config().layout);
    let placed = grid.fill_random(AUTOPLAY_SECTIONS, &mut rand::rng());
    info!("Autoplay filled {} random bubbles", placed);
    session.load_grid(grid);
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum Autoplay {
    #[default]
    Idle,
    AwaitingHint,
    AwaitingLaunch { shots_before: u32 },
    InFlight,
}

/// Ask for a hint whenever nothing is in flight, then fire along it.
fn autoplay(
    session: Res<GameSession>,
    pending: Res<PendingHint>,
    mut state: Local<Autoplay>,
    mut hints: MessageReader<HintReady>,
    mut request: MessageWriter<RequestHint>,
    mut fire: MessageWriter<FireBubble>,
) {
    if session.outcome().is_over() {
        return;
    }

    for ready in hints.read() {
        let direction = match ready.hint {
            Some(hint) => hint.direction,
            None => {
                // Nothing scores; lob one somewhere instead.
                Vec2::new(rand::random_range(-0.8..0.8), -1.0)
            }
        };
        fire.write(FireBubble { direction });
        *state = Autoplay::AwaitingLaunch {
            shots_before: session.stats().shots_fired,
        };
    }

    *state = match *state {
        Autoplay::Idle if !pending.is_running() => {
            request.write(RequestHint);
            Autoplay::AwaitingHint
        }
        Autoplay::AwaitingLaunch { shots_before } if session.stats().shots_fired > shots_before => {
            Autoplay::InFlight
        }
        Autoplay::InFlight if session.flying_count() == 0 => Autoplay::Idle,
        other => other,
    };
}

fn log_stats(mut updates: MessageReader<StatsUpdated>) {
    for update in updates.read() {
        debug!(
            "Score {} (streak {}, max combo {})",
            update.stats.score, update.stats.streak, update.stats.max_combo
        );
    }
}

fn exit_when_over(
    mut won: MessageReader<GameWon>,
    mut lost: MessageReader<GameLost>,
    mut app_exit: MessageWriter<AppExit>,
) {
    for event in won.read() {
        info!(
            "Autoplay won with {} points in {} shots",
            event.stats.score, event.stats.shots_fired
        );
        app_exit.write(AppExit::Success);
    }
    for event in lost.read() {
        info!(
            "Autoplay lost with {} points in {} shots",
            event.stats.score, event.stats.shots_fired
        );
        app_exit.write(AppExit::Success);
    }
}
