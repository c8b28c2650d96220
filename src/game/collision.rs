//! Collision resolution - turning a contact into a snap.
//!
//! When a bubble in flight touches a snapped bubble, it snaps into the empty
//! neighbor cell closest to where it is. When it touches a side wall it
//! bounces; the top wall snaps it into the top section. After every snap the
//! match resolver runs.

use bevy::log::{debug, info, warn};
use bevy::math::Vec2;

use super::{
    bubble::BubbleId,
    cluster::{MatchOutcome, MatchResolver, RemovalSink},
    grid::GridModel,
    hex::GridCoord,
    physics::{BodyRef, Contact, PhysicsWorld, WallSide},
};

/// What a contact turned into.
#[derive(Debug, Clone, PartialEq)]
pub enum Landing {
    /// The mover snapped into the grid and was resolved.
    Snapped {
        bubble: BubbleId,
        coord: GridCoord,
        outcome: MatchOutcome,
    },
    /// The mover bounced off a side wall and keeps flying.
    Bounced { bubble: BubbleId, wall: WallSide },
    /// The mover hit a bubble sitting in the last section: game over.
    Overflow { bubble: BubbleId },
    /// No empty cell to snap into; the mover was thrown away.
    Discarded { bubble: BubbleId },
    /// Not exactly one mover, or nothing actionable.
    Ignored,
}

/// Pick the empty candidate whose center is nearest to `point`.
pub fn nearest_empty_cell(
    grid: &GridModel,
    candidates: impl IntoIterator<Item = GridCoord>,
    point: Vec2,
) -> Option<GridCoord> {
    candidates
        .into_iter()
        .filter(|coord| grid.layout().contains(*coord) && !grid.is_occupied(*coord))
        .min_by(|a, b| {
            let da = grid.cell_center(*a).distance_squared(point);
            let db = grid.cell_center(*b).distance_squared(point);
            da.total_cmp(&db)
        })
}

/// Where a bubble at `point` touching the snapped bubble at `stationary`
/// would settle.
pub fn snap_target(grid: &GridModel, stationary: GridCoord, point: Vec2) -> Option<GridCoord> {
    nearest_empty_cell(grid, grid.neighbors(stationary), point)
}

/// Where a bubble at `point` touching the top wall would settle.
pub fn top_snap_target(grid: &GridModel, point: Vec2) -> Option<GridCoord> {
    nearest_empty_cell(grid, grid.coords_in_section(0), point)
}

/// Snap-and-commit policy.
#[derive(Debug, Default)]
pub struct CollisionResolver {
    matcher: MatchResolver,
}

impl CollisionResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle one contact reported by [`PhysicsWorld::step`].
    pub fn resolve(
        &mut self,
        contact: Contact,
        world: &mut PhysicsWorld,
        grid: &mut GridModel,
        sink: &mut impl RemovalSink,
    ) -> Landing {
        match (contact.first, contact.second) {
            (BodyRef::Bubble(a), BodyRef::Bubble(b)) => self.bubble_bubble(a, b, world, grid, sink),
            (BodyRef::Bubble(bubble), BodyRef::Wall(wall))
            | (BodyRef::Wall(wall), BodyRef::Bubble(bubble)) => {
                self.bubble_wall(bubble, wall, world, grid, sink)
            }
            (BodyRef::Wall(_), BodyRef::Wall(_)) => Landing::Ignored,
        }
    }

    fn bubble_bubble(
        &mut self,
        a: BubbleId,
        b: BubbleId,
        world: &mut PhysicsWorld,
        grid: &mut GridModel,
        sink: &mut impl RemovalSink,
    ) -> Landing {
        let a_moving = world.get(a).is_some_and(|bubble| bubble.is_moving());
        let b_moving = world.get(b).is_some_and(|bubble| bubble.is_moving());

        // Exactly one mover; two bubbles in flight colliding is not handled.
        let (mover, stationary) = match (a_moving, b_moving) {
            (true, false) => (a, b),
            (false, true) => (b, a),
            _ => return Landing::Ignored,
        };

        let Some(stationary_coord) = grid.coord_of(stationary) else {
            debug!("Bubble {} touched {} which is not on the grid", mover, stationary);
            return Landing::Ignored;
        };

        if stationary_coord.section >= grid.layout().last_section() {
            info!(
                "Bubble {} hit the bottom section at {}, game over",
                mover, stationary_coord
            );
            world.remove(mover);
            return Landing::Overflow { bubble: mover };
        }

        let Some(point) = world.get(mover).map(|bubble| bubble.center) else {
            return Landing::Ignored;
        };
        match snap_target(grid, stationary_coord, point) {
            Some(coord) => self.commit(mover, coord, world, grid, sink),
            None => {
                warn!(
                    "No empty cell next to {} for bubble {}, discarding it",
                    stationary_coord, mover
                );
                world.remove(mover);
                Landing::Discarded { bubble: mover }
            }
        }
    }

    fn bubble_wall(
        &mut self,
        id: BubbleId,
        wall: WallSide,
        world: &mut PhysicsWorld,
        grid: &mut GridModel,
        sink: &mut impl RemovalSink,
    ) -> Landing {
        let Some(bubble) = world.get_mut(id).filter(|bubble| bubble.is_moving()) else {
            return Landing::Ignored;
        };

        match wall {
            // Point away from the wall; a plain sign flip could re-flip while
            // the bubble still overlaps the wall on the next tick.
            WallSide::Left => {
                bubble.velocity.x = bubble.velocity.x.abs();
                Landing::Bounced { bubble: id, wall }
            }
            WallSide::Right => {
                bubble.velocity.x = -bubble.velocity.x.abs();
                Landing::Bounced { bubble: id, wall }
            }
            WallSide::Top => {
                let point = bubble.center;
                match top_snap_target(grid, point) {
                    Some(coord) => self.commit(id, coord, world, grid, sink),
                    None => {
                        warn!("Top section is full, discarding bubble {}", id);
                        world.remove(id);
                        Landing::Discarded { bubble: id }
                    }
                }
            }
            // Leaving through the bottom is the session's out-of-bounds check.
            WallSide::Bottom => Landing::Ignored,
        }
    }

    /// Move the bubble out of flight and into the grid, then resolve matches.
    fn commit(
        &mut self,
        id: BubbleId,
        coord: GridCoord,
        world: &mut PhysicsWorld,
        grid: &mut GridModel,
        sink: &mut impl RemovalSink,
    ) -> Landing {
        let Some(mut bubble) = world.remove(id) else {
            return Landing::Ignored;
        };
        bubble.velocity = Vec2::ZERO;
        bubble.center = grid.cell_center(coord);
        bubble.radius = grid.layout().bubble_radius();

        info!("Bubble {} landed at {} with kind {:?}", id, coord, bubble.kind);
        grid.set(coord, Some(bubble));

        let outcome = self.matcher.resolve(grid, coord, sink);
        Landing::Snapped {
            bubble: id,
            coord,
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{
        bubble::{Bubble, BubbleColor, BubbleKind},
        hex::GridLayout,
    };

    fn setup() -> (GridModel, PhysicsWorld) {
        let layout = GridLayout::default();
        (GridModel::new(layout), PhysicsWorld::enclosing(&layout))
    }

    fn launch(world: &mut PhysicsWorld, color: BubbleColor, center: Vec2, velocity: Vec2) -> BubbleId {
        let bubble = Bubble::colored(color, center, 16.0).with_velocity(velocity);
        let id = bubble.id();
        world.insert(bubble);
        id
    }

    fn contact(a: BodyRef, b: BodyRef) -> Contact {
        Contact { first: a, second: b }
    }

    #[test]
    fn test_snaps_into_nearest_empty_neighbor() {
        let (mut grid, mut world) = setup();
        let target = GridCoord::new(0, 5);
        let stationary = grid.place(target, BubbleKind::Colored(BubbleColor::Blue)).unwrap();

        // Coming from below and slightly to the right of the target.
        let below_right = grid.cell_center(GridCoord::new(1, 5)) + Vec2::new(2.0, 3.0);
        let mover = launch(&mut world, BubbleColor::Red, below_right, Vec2::new(0.0, -8.0));

        let landing = CollisionResolver::new().resolve(
            contact(BodyRef::Bubble(stationary), BodyRef::Bubble(mover)),
            &mut world,
            &mut grid,
            &mut (),
        );

        let Landing::Snapped { coord, outcome, .. } = landing else {
            panic!("expected a snap, got {landing:?}");
        };
        assert_eq!(coord, GridCoord::new(1, 5));
        assert_eq!(outcome.removed(), 0);
        assert_eq!(world.flying_count(), 0);

        let snapped = grid.get(coord).unwrap();
        assert_eq!(snapped.id(), mover);
        assert!(!snapped.is_moving());
        assert_eq!(snapped.center, grid.cell_center(coord));
    }

    #[test]
    fn test_ignores_unless_exactly_one_mover() {
        let (mut grid, mut world) = setup();
        let a = launch(&mut world, BubbleColor::Red, Vec2::new(100.0, 200.0), Vec2::new(1.0, -1.0));
        let b = launch(&mut world, BubbleColor::Red, Vec2::new(120.0, 200.0), Vec2::new(-1.0, -1.0));

        let landing = CollisionResolver::new().resolve(
            contact(BodyRef::Bubble(a), BodyRef::Bubble(b)),
            &mut world,
            &mut grid,
            &mut (),
        );
        assert_eq!(landing, Landing::Ignored);
        assert_eq!(world.flying_count(), 2);
    }

    #[test]
    fn test_hitting_last_section_is_overflow() {
        let (mut grid, mut world) = setup();
        let bottom = GridCoord::new(grid.layout().last_section(), 3);
        let stationary = grid.place(bottom, BubbleKind::Colored(BubbleColor::Green)).unwrap();
        let point = grid.cell_center(bottom) + Vec2::new(0.0, 20.0);
        let mover = launch(&mut world, BubbleColor::Green, point, Vec2::new(0.0, -8.0));

        let landing = CollisionResolver::new().resolve(
            contact(BodyRef::Bubble(mover), BodyRef::Bubble(stationary)),
            &mut world,
            &mut grid,
            &mut (),
        );
        assert_eq!(landing, Landing::Overflow { bubble: mover });
        assert_eq!(world.flying_count(), 0);
        assert_eq!(grid.len(), 1);
    }

    #[test]
    fn test_no_empty_neighbor_discards() {
        let (mut grid, mut world) = setup();
        let target = GridCoord::new(2, 5);
        let stationary = grid.place(target, BubbleKind::Colored(BubbleColor::Red)).unwrap();
        for neighbor in grid.neighbors(target) {
            grid.place(neighbor, BubbleKind::Colored(BubbleColor::Blue));
        }
        let mover = launch(&mut world, BubbleColor::Red, grid.cell_center(target), Vec2::new(0.0, -8.0));

        let landing = CollisionResolver::new().resolve(
            contact(BodyRef::Bubble(mover), BodyRef::Bubble(stationary)),
            &mut world,
            &mut grid,
            &mut (),
        );
        assert_eq!(landing, Landing::Discarded { bubble: mover });
        assert_eq!(world.flying_count(), 0);
        assert_eq!(grid.len(), 7);
    }

    #[test]
    fn test_side_walls_reflect_horizontal_velocity() {
        let (mut grid, mut world) = setup();
        let mover = launch(&mut world, BubbleColor::Red, Vec2::new(10.0, 200.0), Vec2::new(-3.0, -8.0));
        let mut resolver = CollisionResolver::new();

        let landing = resolver.resolve(
            contact(BodyRef::Bubble(mover), BodyRef::Wall(WallSide::Left)),
            &mut world,
            &mut grid,
            &mut (),
        );
        assert_eq!(landing, Landing::Bounced { bubble: mover, wall: WallSide::Left });
        assert_eq!(world.get(mover).unwrap().velocity, Vec2::new(3.0, -8.0));

        // A second contact with the same wall does not flip it back.
        resolver.resolve(
            contact(BodyRef::Wall(WallSide::Left), BodyRef::Bubble(mover)),
            &mut world,
            &mut grid,
            &mut (),
        );
        assert_eq!(world.get(mover).unwrap().velocity, Vec2::new(3.0, -8.0));

        resolver.resolve(
            contact(BodyRef::Bubble(mover), BodyRef::Wall(WallSide::Right)),
            &mut world,
            &mut grid,
            &mut (),
        );
        assert_eq!(world.get(mover).unwrap().velocity, Vec2::new(-3.0, -8.0));
    }

    #[test]
    fn test_top_wall_snaps_into_top_section() {
        let (mut grid, mut world) = setup();
        grid.place(GridCoord::new(0, 4), BubbleKind::Colored(BubbleColor::Blue));
        // Right under the occupied cell, so the nearest empty one is next door.
        let point = grid.cell_center(GridCoord::new(0, 4)) + Vec2::new(3.0, 0.0);
        let mover = launch(&mut world, BubbleColor::Red, point, Vec2::new(0.0, -8.0));

        let landing = CollisionResolver::new().resolve(
            contact(BodyRef::Bubble(mover), BodyRef::Wall(WallSide::Top)),
            &mut world,
            &mut grid,
            &mut (),
        );
        let Landing::Snapped { coord, .. } = landing else {
            panic!("expected a snap, got {landing:?}");
        };
        assert_eq!(coord, GridCoord::new(0, 5));
    }

    #[test]
    fn test_snap_triggers_match_resolution() {
        let (mut grid, mut world) = setup();
        grid.place(GridCoord::new(0, 0), BubbleKind::Colored(BubbleColor::Red));
        let stationary = grid
            .place(GridCoord::new(0, 1), BubbleKind::Colored(BubbleColor::Red))
            .unwrap();
        let point = grid.cell_center(GridCoord::new(0, 2)) + Vec2::new(0.0, 5.0);
        let mover = launch(&mut world, BubbleColor::Red, point, Vec2::new(-2.0, -8.0));

        let mut effects = Vec::new();
        let landing = CollisionResolver::new().resolve(
            contact(BodyRef::Bubble(mover), BodyRef::Bubble(stationary)),
            &mut world,
            &mut grid,
            &mut effects,
        );
        let Landing::Snapped { outcome, .. } = landing else {
            panic!("expected a snap, got {landing:?}");
        };
        assert_eq!(outcome.removed(), 3);
        assert!(outcome.snapped_cleared);
        assert_eq!(effects.len(), 3);
        assert!(grid.is_empty());
    }
}
