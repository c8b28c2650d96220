//! Best-shot hints.
//!
//! A hint sweeps the aiming cone, traces where each shot would settle and
//! scores it by how many bubbles it would remove. The search runs on a
//! private snapshot of the grid, so it can run on a background task while
//! the live game keeps ticking.

use bevy::prelude::*;
use bevy::tasks::{AsyncComputeTaskPool, Task, block_on};

use super::{
    bubble::{Bubble, BubbleColor, BubbleKind},
    cluster::MatchResolver,
    collision::{snap_target, top_snap_target},
    grid::GridModel,
    hex::GridCoord,
    physics::{BodyRef, PhysicsWorld, WallSide},
    session::GameSession,
    shooter::MAX_AIM_ANGLE,
};

pub(super) fn plugin(app: &mut App) {
    app.init_resource::<PendingHint>();
    app.add_message::<RequestHint>();
    app.add_message::<HintReady>();

    app.add_systems(Update, (start_hint_search, poll_hint_search).chain());
}

/// Number of aim angles tried across the cone.
const HINT_SAMPLES: usize = 61;

/// Give up on a trace after this many ticks.
const MAX_TRACE_STEPS: usize = 4096;

/// The best shot found.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hint {
    /// Unit aim direction.
    pub direction: Vec2,
    /// Cell the shot settles in.
    pub target: GridCoord,
    /// Bubbles the shot would remove.
    pub removals: usize,
}

/// Everything a hint search needs, owned.
#[derive(Debug)]
pub struct HintRequest {
    pub grid: GridModel,
    pub world: PhysicsWorld,
    pub origin: Vec2,
    pub color: BubbleColor,
    pub speed: f32,
    pub radius: f32,
}

impl HintRequest {
    /// Follow a shot until it would snap. `None` if it never settles.
    pub fn trace(&self, direction: Vec2) -> Option<GridCoord> {
        let mut bubble = Bubble::colored(self.color, self.origin, self.radius)
            .with_velocity(direction.normalize_or_zero() * self.speed);
        if !bubble.is_moving() {
            return None;
        }

        for _ in 0..MAX_TRACE_STEPS {
            match self.world.simulate_step(&mut bubble, &self.grid) {
                None => {}
                Some(BodyRef::Bubble(id)) => {
                    let stationary = self.grid.coord_of(id)?;
                    if stationary.section >= self.grid.layout().last_section() {
                        return None;
                    }
                    return snap_target(&self.grid, stationary, bubble.center);
                }
                Some(BodyRef::Wall(WallSide::Left)) => {
                    bubble.velocity.x = bubble.velocity.x.abs();
                }
                Some(BodyRef::Wall(WallSide::Right)) => {
                    bubble.velocity.x = -bubble.velocity.x.abs();
                }
                Some(BodyRef::Wall(WallSide::Top)) => {
                    return top_snap_target(&self.grid, bubble.center);
                }
                Some(BodyRef::Wall(WallSide::Bottom)) => return None,
            }
        }
        None
    }

    /// Sweep the cone and return the shot removing the most bubbles.
    ///
    /// Ties go to the first angle tried. Returns `None` when no shot removes
    /// anything.
    pub fn compute(&self) -> Option<Hint> {
        let mut trial = self.grid.snapshot();
        let mut best: Option<Hint> = None;

        for i in 0..HINT_SAMPLES {
            let t = i as f32 / (HINT_SAMPLES - 1) as f32;
            let angle = -MAX_AIM_ANGLE + t * 2.0 * MAX_AIM_ANGLE;
            let direction = Vec2::new(angle.sin(), -angle.cos());

            let Some(target) = self.trace(direction) else {
                continue;
            };
            trial.place(target, BubbleKind::Colored(self.color));
            let removals = MatchResolver::simulate(&trial, target);
            trial.take(target);

            if removals > best.map_or(0, |hint| hint.removals) {
                best = Some(Hint {
                    direction,
                    target,
                    removals,
                });
            }
        }

        match best {
            Some(hint) => debug!(
                "Hint: aim {:?} into {} for {} bubbles",
                hint.direction, hint.target, hint.removals
            ),
            None => debug!("Hint: no shot removes anything"),
        }
        best
    }
}

/// Ask for a hint for the currently loaded bubble.
#[derive(Message, Debug, Clone, Default)]
pub struct RequestHint;

/// A finished hint search.
#[derive(Message, Debug, Clone)]
pub struct HintReady {
    pub hint: Option<Hint>,
}

/// The search in flight, if any.
#[derive(Resource, Default)]
pub struct PendingHint(Option<Task<Option<Hint>>>);

impl PendingHint {
    pub fn is_running(&self) -> bool {
        self.0.is_some()
    }
}

fn start_hint_search(
    mut requests: MessageReader<RequestHint>,
    session: Res<GameSession>,
    mut pending: ResMut<PendingHint>,
) {
    if requests.read().count() == 0 {
        return;
    }
    if pending.is_running() {
        debug!("Hint search already running, ignoring request");
        return;
    }

    let request = session.hint_request();
    let task = AsyncComputeTaskPool::get().spawn(async move { request.compute() });
    pending.0 = Some(task);
}

fn poll_hint_search(mut pending: ResMut<PendingHint>, mut ready: MessageWriter<HintReady>) {
    if !pending.0.as_ref().is_some_and(Task::is_finished) {
        return;
    }
    if let Some(task) = pending.0.take() {
        let hint = block_on(task);
        ready.write(HintReady { hint });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{
        hex::GridLayout,
        shooter::{Cannon, DEFAULT_SHOT_SPEED},
    };

    fn request(grid: GridModel, color: BubbleColor) -> HintRequest {
        let layout = *grid.layout();
        let cannon = Cannon::seeded(&layout, DEFAULT_SHOT_SPEED, 0);
        HintRequest {
            world: PhysicsWorld::enclosing(&layout),
            grid,
            origin: cannon.origin,
            color,
            speed: DEFAULT_SHOT_SPEED,
            radius: layout.bubble_radius(),
        }
    }

    fn two_reds() -> GridModel {
        let mut grid = GridModel::new(GridLayout::default());
        grid.place(GridCoord::new(0, 5), BubbleKind::Colored(BubbleColor::Red));
        grid.place(GridCoord::new(0, 6), BubbleKind::Colored(BubbleColor::Red));
        grid
    }

    #[test]
    fn test_straight_shot_settles_between_pair() {
        let request = request(two_reds(), BubbleColor::Red);
        assert_eq!(
            request.trace(Vec2::new(0.0, -1.0)),
            Some(GridCoord::new(1, 5))
        );
    }

    #[test]
    fn test_hint_finds_matching_shot() {
        let request = request(two_reds(), BubbleColor::Red);
        let hint = request.compute().unwrap();
        assert_eq!(hint.removals, 3);
        assert!(hint.target.section <= 1);
        assert!((hint.direction.length() - 1.0).abs() < 1e-4);

        // The search never touches its input grid.
        assert_eq!(request.grid.len(), 2);
    }

    #[test]
    fn test_no_hint_without_a_match() {
        assert!(request(two_reds(), BubbleColor::Blue).compute().is_none());
    }

    #[test]
    fn test_angled_shot_bounces_to_top() {
        let request = request(GridModel::new(GridLayout::default()), BubbleColor::Green);
        let angle = -MAX_AIM_ANGLE;
        let target = request.trace(Vec2::new(angle.sin(), -angle.cos()));
        assert!(target.is_some_and(|coord| coord.section == 0));
    }
}
