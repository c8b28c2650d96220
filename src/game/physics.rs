//! Physics world - moves bubbles in flight and detects what they hit.
//!
//! Integration is plain Euler on a fixed tick: `center += velocity`, no
//! sub-stepping. After moving, every bubble that moved is tested against the
//! other bubbles in flight, the snapped bubbles on the grid and the walls.
//! Stationary bodies are never tested against each other.

use std::collections::HashSet;

use bevy::math::Vec2;
use bevy::reflect::Reflect;

use super::{
    bubble::{Bubble, BubbleId},
    grid::GridModel,
    hex::GridLayout,
};

/// Collision shape of a body, centered on its position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Collider {
    Circle { radius: f32 },
    Box { half_extents: Vec2 },
}

/// Overlap test between two positioned shapes.
///
/// - circle/circle: center distance <= sum of radii
/// - circle/box: squared distance to the clamped box point < radius squared
/// - box/box: axis-aligned overlap on both axes
pub fn overlaps(a_pos: Vec2, a: Collider, b_pos: Vec2, b: Collider) -> bool {
    match (a, b) {
        (Collider::Circle { radius: ra }, Collider::Circle { radius: rb }) => {
            a_pos.distance(b_pos) <= ra + rb
        }
        (Collider::Circle { radius }, Collider::Box { half_extents }) => {
            circle_box(a_pos, radius, b_pos, half_extents)
        }
        (Collider::Box { half_extents }, Collider::Circle { radius }) => {
            circle_box(b_pos, radius, a_pos, half_extents)
        }
        (Collider::Box { half_extents: ha }, Collider::Box { half_extents: hb }) => {
            let delta = (a_pos - b_pos).abs();
            let reach = ha + hb;
            delta.x < reach.x && delta.y < reach.y
        }
    }
}

fn circle_box(center: Vec2, radius: f32, box_center: Vec2, half_extents: Vec2) -> bool {
    let closest = center.clamp(box_center - half_extents, box_center + half_extents);
    center.distance_squared(closest) < radius * radius
}

/// Which boundary of the play field a wall is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum WallSide {
    Left,
    Right,
    Top,
    Bottom,
}

/// A static axis-aligned wall.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Wall {
    pub side: WallSide,
    pub center: Vec2,
    pub half_extents: Vec2,
}

impl Wall {
    pub fn collider(&self) -> Collider {
        Collider::Box {
            half_extents: self.half_extents,
        }
    }
}

/// One side of a contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyRef {
    Bubble(BubbleId),
    Wall(WallSide),
}

/// Two bodies found touching during a step.
///
/// The order is whatever the iteration produced; it is not canonical.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contact {
    pub first: BodyRef,
    pub second: BodyRef,
}

/// The set of tracked bodies: bubbles in flight plus the walls.
#[derive(Debug, Clone, Default)]
pub struct PhysicsWorld {
    flying: Vec<Bubble>,
    walls: Vec<Wall>,
}

impl PhysicsWorld {
    /// A world with the left, right and top walls enclosing `layout`.
    ///
    /// The bottom stays open; bubbles leaving through it are handled as out
    /// of bounds by the session.
    pub fn enclosing(layout: &GridLayout) -> Self {
        let thickness = layout.cell_diameter;
        let width = layout.field_width();
        let height = layout.field_height() + thickness * 4.0;

        let side = Vec2::new(thickness * 0.5, height);
        Self {
            flying: Vec::new(),
            walls: vec![
                Wall {
                    side: WallSide::Left,
                    center: Vec2::new(-thickness * 0.5, height * 0.5),
                    half_extents: side,
                },
                Wall {
                    side: WallSide::Right,
                    center: Vec2::new(width + thickness * 0.5, height * 0.5),
                    half_extents: side,
                },
                Wall {
                    side: WallSide::Top,
                    center: Vec2::new(width * 0.5, -thickness * 0.5),
                    half_extents: Vec2::new(width * 0.5 + thickness, thickness * 0.5),
                },
            ],
        }
    }

    /// A world with the same walls and nothing in flight.
    pub fn detached(&self) -> Self {
        Self {
            flying: Vec::new(),
            walls: self.walls.clone(),
        }
    }

    pub fn walls(&self) -> &[Wall] {
        &self.walls
    }

    pub fn wall(&self, side: WallSide) -> Option<&Wall> {
        self.walls.iter().find(|wall| wall.side == side)
    }

    /// Start tracking a bubble in flight.
    pub fn insert(&mut self, bubble: Bubble) {
        self.flying.push(bubble);
    }

    /// Stop tracking a bubble, handing it back.
    pub fn remove(&mut self, id: BubbleId) -> Option<Bubble> {
        let index = self.flying.iter().position(|b| b.id() == id)?;
        Some(self.flying.swap_remove(index))
    }

    pub fn get(&self, id: BubbleId) -> Option<&Bubble> {
        self.flying.iter().find(|b| b.id() == id)
    }

    pub fn get_mut(&mut self, id: BubbleId) -> Option<&mut Bubble> {
        self.flying.iter_mut().find(|b| b.id() == id)
    }

    /// Bubbles currently in flight.
    pub fn flying(&self) -> &[Bubble] {
        &self.flying
    }

    pub fn flying_count(&self) -> usize {
        self.flying.len()
    }

    /// Drop every bubble in flight.
    pub fn clear_flying(&mut self) {
        self.flying.clear();
    }

    /// Advance one fixed tick and report every contact found.
    ///
    /// Each touching pair is reported once. Contacts are collected before
    /// anyone reacts to them, so a reaction cannot cause a re-check within
    /// the same tick.
    pub fn step(&mut self, grid: &GridModel) -> Vec<Contact> {
        let mut movers = Vec::new();
        for (index, bubble) in self.flying.iter_mut().enumerate() {
            if bubble.is_moving() {
                bubble.center += bubble.velocity;
                movers.push(index);
            }
        }

        let mut contacts = Vec::new();
        let mut seen_pairs: HashSet<(BubbleId, BubbleId)> = HashSet::new();

        for &index in &movers {
            let mover = &self.flying[index];
            let shape = Collider::Circle {
                radius: mover.radius,
            };

            for (other_index, other) in self.flying.iter().enumerate() {
                if other_index == index {
                    continue;
                }
                let other_shape = Collider::Circle {
                    radius: other.radius,
                };
                if overlaps(mover.center, shape, other.center, other_shape) {
                    let pair = if mover.id() < other.id() {
                        (mover.id(), other.id())
                    } else {
                        (other.id(), mover.id())
                    };
                    if seen_pairs.insert(pair) {
                        contacts.push(Contact {
                            first: BodyRef::Bubble(mover.id()),
                            second: BodyRef::Bubble(other.id()),
                        });
                    }
                }
            }

            contacts.extend(Self::contacts_against_field(mover, shape, grid, &self.walls));
        }

        contacts
    }

    /// Move a detached bubble by one tick without touching the registry.
    ///
    /// Used for trajectory prediction. Only the grid and walls are considered
    /// and the first body hit is returned.
    pub fn simulate_step(&self, bubble: &mut Bubble, grid: &GridModel) -> Option<BodyRef> {
        bubble.center += bubble.velocity;
        let shape = Collider::Circle {
            radius: bubble.radius,
        };
        Self::contacts_against_field(bubble, shape, grid, &self.walls)
            .into_iter()
            .next()
            .map(|contact| contact.second)
    }

    fn contacts_against_field(
        mover: &Bubble,
        shape: Collider,
        grid: &GridModel,
        walls: &[Wall],
    ) -> Vec<Contact> {
        let mut contacts = Vec::new();

        for (_, snapped) in grid.iter() {
            let other_shape = Collider::Circle {
                radius: snapped.radius,
            };
            if overlaps(mover.center, shape, snapped.center, other_shape) {
                contacts.push(Contact {
                    first: BodyRef::Bubble(mover.id()),
                    second: BodyRef::Bubble(snapped.id()),
                });
            }
        }

        for wall in walls {
            if overlaps(mover.center, shape, wall.center, wall.collider()) {
                contacts.push(Contact {
                    first: BodyRef::Bubble(mover.id()),
                    second: BodyRef::Wall(wall.side),
                });
            }
        }

        contacts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{
        bubble::{BubbleColor, BubbleKind},
        hex::GridCoord,
    };

    fn circle(radius: f32) -> Collider {
        Collider::Circle { radius }
    }

    #[test]
    fn test_circle_circle_touching_counts() {
        assert!(overlaps(Vec2::ZERO, circle(1.0), Vec2::new(2.0, 0.0), circle(1.0)));
        assert!(!overlaps(Vec2::ZERO, circle(1.0), Vec2::new(2.01, 0.0), circle(1.0)));
    }

    #[test]
    fn test_circle_box_uses_nearest_point() {
        let wall = Collider::Box {
            half_extents: Vec2::new(1.0, 10.0),
        };
        // Touching exactly is not a hit (strict comparison).
        assert!(!overlaps(Vec2::new(3.0, 0.0), circle(2.0), Vec2::ZERO, wall));
        assert!(overlaps(Vec2::new(2.9, 0.0), circle(2.0), Vec2::ZERO, wall));
        // Corner region measures to the corner, not the face.
        assert!(!overlaps(Vec2::new(2.5, 11.5), circle(2.0), Vec2::ZERO, wall));
        // Argument order does not matter.
        assert!(overlaps(Vec2::ZERO, wall, Vec2::new(2.9, 0.0), circle(2.0)));
    }

    #[test]
    fn test_box_box_overlap() {
        let unit = Collider::Box {
            half_extents: Vec2::ONE,
        };
        assert!(overlaps(Vec2::ZERO, unit, Vec2::new(1.5, 1.5), unit));
        assert!(!overlaps(Vec2::ZERO, unit, Vec2::new(2.5, 0.0), unit));
    }

    #[test]
    fn test_step_integrates_only_movers() {
        let layout = GridLayout::default();
        let grid = GridModel::new(layout);
        let mut world = PhysicsWorld::enclosing(&layout);

        let flying = Bubble::colored(BubbleColor::Red, Vec2::new(100.0, 300.0), 16.0)
            .with_velocity(Vec2::new(0.0, -8.0));
        let resting = Bubble::colored(BubbleColor::Blue, Vec2::new(300.0, 300.0), 16.0);
        let (flying_id, resting_id) = (flying.id(), resting.id());
        world.insert(flying);
        world.insert(resting);

        let contacts = world.step(&grid);
        assert!(contacts.is_empty());
        assert_eq!(world.get(flying_id).unwrap().center, Vec2::new(100.0, 292.0));
        assert_eq!(world.get(resting_id).unwrap().center, Vec2::new(300.0, 300.0));
    }

    #[test]
    fn test_step_reports_grid_and_wall_contacts() {
        let layout = GridLayout::default();
        let mut grid = GridModel::new(layout);
        let target = GridCoord::new(0, 0);
        let target_id = grid.place(target, BubbleKind::Colored(BubbleColor::Red)).unwrap();

        let mut world = PhysicsWorld::enclosing(&layout);
        // Hugging the left wall just below the corner bubble, moving up.
        let start = layout.cell_center(target) + Vec2::new(-1.0, layout.cell_diameter + 4.0);
        let mover = Bubble::colored(BubbleColor::Red, start, 16.0)
            .with_velocity(Vec2::new(0.0, -8.0));
        let mover_id = mover.id();
        world.insert(mover);

        let contacts = world.step(&grid);
        assert!(contacts.contains(&Contact {
            first: BodyRef::Bubble(mover_id),
            second: BodyRef::Bubble(target_id),
        }));
        assert!(contacts.contains(&Contact {
            first: BodyRef::Bubble(mover_id),
            second: BodyRef::Wall(WallSide::Left),
        }));
    }

    #[test]
    fn test_two_movers_reported_once() {
        let layout = GridLayout::default();
        let grid = GridModel::new(layout);
        let mut world = PhysicsWorld::enclosing(&layout);
        world.insert(
            Bubble::colored(BubbleColor::Red, Vec2::new(150.0, 300.0), 16.0)
                .with_velocity(Vec2::new(4.0, 0.0)),
        );
        world.insert(
            Bubble::colored(BubbleColor::Red, Vec2::new(190.0, 300.0), 16.0)
                .with_velocity(Vec2::new(-4.0, 0.0)),
        );

        let contacts = world.step(&grid);
        assert_eq!(contacts.len(), 1);
    }

    #[test]
    fn test_simulate_step_leaves_registry_alone() {
        let layout = GridLayout::default();
        let grid = GridModel::new(layout);
        let world = PhysicsWorld::enclosing(&layout);

        let mut probe = Bubble::colored(BubbleColor::Green, Vec2::new(100.0, 20.0), 16.0)
            .with_velocity(Vec2::new(0.0, -8.0));
        let hit = world.simulate_step(&mut probe, &grid);
        assert_eq!(hit, Some(BodyRef::Wall(WallSide::Top)));
        assert_eq!(probe.center, Vec2::new(100.0, 12.0));
        assert_eq!(world.flying_count(), 0);
    }
}
