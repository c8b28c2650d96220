//! A running game: the grid, the bubbles in flight and the bookkeeping
//! around them, driven by a fixed tick and a one-second clock.
//!
//! [`GameSession`] is plain state with methods so it can be driven directly;
//! the plugin wires it to Bevy's schedules and messages.

use bevy::prelude::*;

use super::{
    cluster::RemovalEffect,
    collision::{CollisionResolver, Landing},
    grid::GridModel,
    hex::{GridCoord, GridLayout},
    hint::HintRequest,
    level::LevelStore,
    physics::PhysicsWorld,
    shooter::{Cannon, DEFAULT_SHOT_SPEED},
    state::{DEFAULT_TIME_BUDGET_SECS, Evaluator, GameOutcome, GameStats, TimeBudget},
};
use crate::PausableSystems;

pub(super) fn plugin(app: &mut App) {
    app.register_type::<GameStats>();
    app.register_type::<TimeBudget>();
    app.register_type::<GameOutcome>();
    app.register_type::<GridCoord>();
    app.register_type::<GridLayout>();

    app.init_resource::<SessionConfig>();
    app.init_resource::<GameSession>();
    app.init_resource::<BudgetTimer>();

    let hz = app.world().resource::<SessionConfig>().tick_hz;
    app.insert_resource(Time::<Fixed>::from_hz(hz));

    app.add_message::<FireBubble>();
    app.add_message::<StatsUpdated>();
    app.add_message::<GameWon>();
    app.add_message::<GameLost>();
    app.add_message::<TimerTicked>();
    app.add_message::<BubbleRemoved>();

    app.add_systems(
        FixedUpdate,
        (fire_bubbles, step_session)
            .chain()
            .in_set(PausableSystems)
            .in_set(SessionSystems),
    );
    app.add_systems(
        Update,
        (
            tick_budget_timer.in_set(PausableSystems),
            publish_session_events,
        )
            .chain()
            .in_set(SessionSystems),
    );
}

/// Default fixed tick rate.
pub const DEFAULT_TICK_HZ: f64 = 60.0;

/// How far past the field a bubble may drift before it counts as lost.
const OUT_OF_BOUNDS_MARGIN: f32 = 4.0;

/// System set for session systems.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionSystems;

/// Tunables for a new session.
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct SessionConfig {
    pub layout: GridLayout,
    pub time_budget_secs: u32,
    /// Play-field units per fixed tick.
    pub shot_speed: f32,
    pub tick_hz: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            layout: GridLayout::default(),
            time_budget_secs: DEFAULT_TIME_BUDGET_SECS,
            shot_speed: DEFAULT_SHOT_SPEED,
            tick_hz: DEFAULT_TICK_HZ,
        }
    }
}

/// Things that happened since the last drain.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StatsUpdated(GameStats),
    Won,
    Lost,
    TimerTick { remaining: u32 },
}

#[derive(Resource, Debug)]
pub struct GameSession {
    config: SessionConfig,
    grid: GridModel,
    physics: PhysicsWorld,
    resolver: CollisionResolver,
    stats: GameStats,
    evaluator: Evaluator,
    time: TimeBudget,
    cannon: Cannon,
    events: Vec<SessionEvent>,
    effects: Vec<RemovalEffect>,
}

impl FromWorld for GameSession {
    fn from_world(world: &mut World) -> Self {
        let config = world
            .get_resource::<SessionConfig>()
            .copied()
            .unwrap_or_default();
        Self::new(config)
    }
}

impl GameSession {
    /// An empty grid, a full clock and a randomly seeded cannon.
    pub fn new(config: SessionConfig) -> Self {
        let cannon = Cannon::new(&config.layout, config.shot_speed);
        Self::with_cannon(config, cannon)
    }

    /// Same as [`GameSession::new`] with a deterministic cannon.
    pub fn seeded(config: SessionConfig, seed: u64) -> Self {
        let cannon = Cannon::seeded(&config.layout, config.shot_speed, seed);
        Self::with_cannon(config, cannon)
    }

    fn with_cannon(config: SessionConfig, cannon: Cannon) -> Self {
        Self {
            config,
            grid: GridModel::new(config.layout),
            physics: PhysicsWorld::enclosing(&config.layout),
            resolver: CollisionResolver::new(),
            stats: GameStats::default(),
            evaluator: Evaluator::default(),
            time: TimeBudget::new(config.time_budget_secs),
            cannon,
            events: Vec::new(),
            effects: Vec::new(),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn grid(&self) -> &GridModel {
        &self.grid
    }

    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    pub fn stats(&self) -> &GameStats {
        &self.stats
    }

    pub fn time(&self) -> &TimeBudget {
        &self.time
    }

    pub fn cannon(&self) -> &Cannon {
        &self.cannon
    }

    pub fn cannon_mut(&mut self) -> &mut Cannon {
        &mut self.cannon
    }

    pub fn outcome(&self) -> GameOutcome {
        self.evaluator.outcome()
    }

    pub fn flying_count(&self) -> usize {
        self.physics.flying_count()
    }

    /// Fire the loaded bubble. Returns whether a bubble left the cannon.
    pub fn fire(&mut self, direction: Vec2) -> bool {
        if self.outcome().is_over() {
            return false;
        }
        let Some(bubble) = self.cannon.fire(direction, &self.time) else {
            return false;
        };
        self.stats.record_shot_fired();
        self.physics.insert(bubble);
        true
    }

    /// Advance one fixed tick: move, resolve every contact, then evaluate.
    pub fn tick(&mut self) {
        if self.outcome().is_over() {
            return;
        }

        let contacts = self.physics.step(&self.grid);
        for contact in contacts {
            let landing = self.resolver.resolve(
                contact,
                &mut self.physics,
                &mut self.grid,
                &mut self.effects,
            );
            match landing {
                Landing::Snapped { outcome, .. } => {
                    self.stats.record_outcome(&outcome);
                    self.events
                        .push(SessionEvent::StatsUpdated(self.stats.clone()));
                }
                Landing::Overflow { .. } => {
                    if self.evaluator.force_loss() {
                        self.events.push(SessionEvent::Lost);
                    }
                    // The board is frozen from here on.
                    return;
                }
                Landing::Discarded { .. } => {
                    self.stats.record_miss();
                    self.events
                        .push(SessionEvent::StatsUpdated(self.stats.clone()));
                }
                Landing::Bounced { .. } | Landing::Ignored => {}
            }
        }

        self.remove_out_of_bounds();
        self.evaluate();
    }

    /// Take one second off the clock.
    pub fn tick_timer(&mut self) {
        if self.outcome().is_over() {
            return;
        }
        let remaining = self.time.tick();
        self.events.push(SessionEvent::TimerTick { remaining });
        self.evaluate();
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn drain_effects(&mut self) -> Vec<RemovalEffect> {
        std::mem::take(&mut self.effects)
    }

    /// Start over on a new grid.
    pub fn load_grid(&mut self, grid: GridModel) {
        self.grid = grid;
        self.restart();
    }

    /// Start over on a saved level. On failure nothing changes.
    pub fn load_level(&mut self, store: &LevelStore, name: &str) -> bool {
        if !store.load(name, &mut self.grid) {
            return false;
        }
        self.restart();
        true
    }

    /// Start over on an empty grid.
    pub fn reset(&mut self) {
        self.grid.reset();
        self.restart();
    }

    /// Everything a background hint search needs, detached from live state.
    pub fn hint_request(&self) -> HintRequest {
        HintRequest {
            grid: self.grid.snapshot(),
            world: self.physics.detached(),
            origin: self.cannon.origin,
            color: self.cannon.loaded(),
            speed: self.cannon.speed,
            radius: self.cannon.radius,
        }
    }

    fn restart(&mut self) {
        let layout = *self.grid.layout();
        self.physics = PhysicsWorld::enclosing(&layout);
        self.cannon.fit_to(&layout);
        self.stats.reset();
        self.evaluator.reset();
        self.time.reset();
        self.events.clear();
        self.effects.clear();
        info!(
            "Session started with {} bubbles and {}s on the clock",
            self.grid.len(),
            self.time.total_secs
        );
    }

    fn remove_out_of_bounds(&mut self) {
        let layout = self.grid.layout();
        let margin = layout.cell_diameter * OUT_OF_BOUNDS_MARGIN;
        let max_x = layout.field_width() + margin;
        let max_y = layout.field_height() + margin;

        let lost: Vec<_> = self
            .physics
            .flying()
            .iter()
            .filter(|bubble| {
                let c = bubble.center;
                c.x < -margin || c.x > max_x || c.y < -margin || c.y > max_y
            })
            .map(|bubble| bubble.id())
            .collect();

        for id in lost {
            warn!("Bubble {} left the play field", id);
            self.physics.remove(id);
            self.stats.record_miss();
            self.events
                .push(SessionEvent::StatsUpdated(self.stats.clone()));
        }
    }

    fn evaluate(&mut self) {
        match self
            .evaluator
            .evaluate(&self.grid, self.physics.flying_count(), &self.time)
        {
            Some(GameOutcome::Won) => self.events.push(SessionEvent::Won),
            Some(GameOutcome::Lost) => self.events.push(SessionEvent::Lost),
            Some(GameOutcome::InProgress) | None => {}
        }
    }
}

/// Fire the loaded bubble in a direction (play-field space, up is -y).
#[derive(Message, Debug, Clone)]
pub struct FireBubble {
    pub direction: Vec2,
}

#[derive(Message, Debug, Clone)]
pub struct StatsUpdated {
    pub stats: GameStats,
}

/// The grid was cleared. Carries the final stats.
#[derive(Message, Debug, Clone)]
pub struct GameWon {
    pub stats: GameStats,
}

/// The game was lost. Carries the final stats.
#[derive(Message, Debug, Clone)]
pub struct GameLost {
    pub stats: GameStats,
}

#[derive(Message, Debug, Clone)]
pub struct TimerTicked {
    pub remaining: u32,
}

/// A bubble left the grid; for animation.
#[derive(Message, Debug, Clone)]
pub struct BubbleRemoved {
    pub effect: RemovalEffect,
}

/// Drives the time budget once per second.
#[derive(Resource, Debug)]
pub struct BudgetTimer(pub Timer);

impl Default for BudgetTimer {
    fn default() -> Self {
        Self(Timer::from_seconds(1.0, TimerMode::Repeating))
    }
}

fn fire_bubbles(mut requests: MessageReader<FireBubble>, mut session: ResMut<GameSession>) {
    for request in requests.read() {
        if !session.fire(request.direction) {
            debug!("Shot toward {:?} was not fired", request.direction);
        }
    }
}

fn step_session(mut session: ResMut<GameSession>) {
    session.tick();
}

fn tick_budget_timer(
    time: Res<Time>,
    mut timer: ResMut<BudgetTimer>,
    mut session: ResMut<GameSession>,
) {
    timer.0.tick(time.delta());
    for _ in 0..timer.0.times_finished_this_tick() {
        session.tick_timer();
    }
}

fn publish_session_events(
    mut session: ResMut<GameSession>,
    mut stats_updated: MessageWriter<StatsUpdated>,
    mut won: MessageWriter<GameWon>,
    mut lost: MessageWriter<GameLost>,
    mut ticked: MessageWriter<TimerTicked>,
    mut removed: MessageWriter<BubbleRemoved>,
) {
    for effect in session.drain_effects() {
        removed.write(BubbleRemoved { effect });
    }
    for event in session.drain_events() {
        match event {
            SessionEvent::StatsUpdated(stats) => {
                stats_updated.write(StatsUpdated { stats });
            }
            SessionEvent::Won => {
                won.write(GameWon {
                    stats: session.stats().clone(),
                });
            }
            SessionEvent::Lost => {
                lost.write(GameLost {
                    stats: session.stats().clone(),
                });
            }
            SessionEvent::TimerTick { remaining } => {
                ticked.write(TimerTicked { remaining });
            }
        }
    }
}
