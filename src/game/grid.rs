//! The staggered grid that holds all snapped bubbles.
//!
//! Storage is a flat vector of optional bubbles, one slot per cell, indexed
//! through [`GridLayout::index_of`]. The grid owns every bubble in it.
//! Lookups outside the grid quietly return nothing, since collision-driven
//! code probes boundary coordinates all the time.

use bevy::log::debug;
use bevy::math::Vec2;
use rand::Rng;

use super::{
    bubble::{Bubble, BubbleColor, BubbleId, BubbleKind},
    hex::{GridCoord, GridLayout},
};

/// The grid of snapped bubbles.
#[derive(Debug)]
pub struct GridModel {
    layout: GridLayout,
    slots: Vec<Option<Bubble>>,
}

impl Default for GridModel {
    fn default() -> Self {
        Self::new(GridLayout::default())
    }
}

impl GridModel {
    /// Create an empty grid with the given dimensions.
    pub fn new(layout: GridLayout) -> Self {
        Self {
            layout,
            slots: std::iter::repeat_with(|| None)
                .take(layout.slot_count())
                .collect(),
        }
    }

    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }

    /// Up to 6 adjacent coordinates of `coord`.
    pub fn neighbors(&self, coord: GridCoord) -> Vec<GridCoord> {
        self.layout.neighbors(coord)
    }

    /// Get the bubble at a cell, if any.
    pub fn get(&self, coord: GridCoord) -> Option<&Bubble> {
        self.layout
            .index_of(coord)
            .and_then(|index| self.slots[index].as_ref())
    }

    pub fn get_mut(&mut self, coord: GridCoord) -> Option<&mut Bubble> {
        self.layout
            .index_of(coord)
            .and_then(|index| self.slots[index].as_mut())
    }

    /// Check if a cell is occupied.
    pub fn is_occupied(&self, coord: GridCoord) -> bool {
        self.get(coord).is_some()
    }

    /// Store a bubble (or clear the slot with `None`).
    ///
    /// Returns whatever the slot held before. Out-of-range coordinates leave
    /// the grid untouched and hand the given bubble straight back.
    pub fn set(&mut self, coord: GridCoord, bubble: Option<Bubble>) -> Option<Bubble> {
        match self.layout.index_of(coord) {
            Some(index) => std::mem::replace(&mut self.slots[index], bubble),
            None => {
                debug!("Ignoring write to out-of-range cell {}", coord);
                bubble
            }
        }
    }

    /// Remove a bubble from a cell, returning it.
    pub fn take(&mut self, coord: GridCoord) -> Option<Bubble> {
        self.layout
            .index_of(coord)
            .and_then(|index| self.slots[index].take())
    }

    /// Reverse lookup from identity to cell.
    pub fn coord_of(&self, id: BubbleId) -> Option<GridCoord> {
        self.slots
            .iter()
            .position(|slot| slot.as_ref().is_some_and(|b| b.id() == id))
            .and_then(|index| self.layout.coord_at(index))
    }

    /// Iterate over all occupied cells in flat-index order.
    pub fn iter(&self) -> impl Iterator<Item = (GridCoord, &Bubble)> {
        self.layout
            .coords()
            .zip(self.slots.iter())
            .filter_map(|(coord, slot)| slot.as_ref().map(|bubble| (coord, bubble)))
    }

    /// All occupied coordinates.
    pub fn occupied(&self) -> Vec<GridCoord> {
        self.iter().map(|(coord, _)| coord).collect()
    }

    /// Coordinates of one section, occupied or not, left to right.
    pub fn coords_in_section(&self, section: usize) -> Vec<GridCoord> {
        self.layout.coords_in_section(section)
    }

    /// Occupied coordinates of one section.
    pub fn occupied_in_section(&self, section: usize) -> Vec<GridCoord> {
        self.coords_in_section(section)
            .into_iter()
            .filter(|coord| self.is_occupied(*coord))
            .collect()
    }

    /// Get the number of bubbles in the grid.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Check if the grid is empty.
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// Get the lowest section (highest index) that has bubbles.
    pub fn lowest_section(&self) -> Option<usize> {
        self.iter().map(|(coord, _)| coord.section).max()
    }

    /// Colors currently present on the grid, each listed once.
    pub fn colors(&self) -> Vec<BubbleColor> {
        let mut colors: Vec<BubbleColor> = Vec::new();
        for (_, bubble) in self.iter() {
            if let Some(color) = bubble.color()
                && !colors.contains(&color)
            {
                colors.push(color);
            }
        }
        colors
    }

    /// Deep copy with independently owned bubbles under fresh identities.
    ///
    /// Used for what-if simulation; nothing done to the copy is visible here.
    pub fn snapshot(&self) -> GridModel {
        GridModel {
            layout: self.layout,
            slots: self
                .slots
                .iter()
                .map(|slot| slot.as_ref().map(Bubble::duplicate))
                .collect(),
        }
    }

    /// Clear all bubbles, keeping the dimensions.
    pub fn reset(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
    }

    /// Create a stationary bubble sitting exactly on a cell.
    pub fn bubble_for(&self, kind: BubbleKind, coord: GridCoord) -> Bubble {
        Bubble::new(
            kind,
            self.layout.cell_center(coord),
            self.layout.bubble_radius(),
        )
    }

    /// Place a new stationary bubble of `kind` on a cell.
    ///
    /// Returns the new bubble's id, or `None` if the cell is out of range.
    pub fn place(&mut self, coord: GridCoord, kind: BubbleKind) -> Option<BubbleId> {
        if !self.layout.contains(coord) {
            return None;
        }
        let bubble = self.bubble_for(kind, coord);
        let id = bubble.id();
        self.set(coord, Some(bubble));
        Some(id)
    }

    /// Fill the top `sections` sections with random colored bubbles.
    pub fn fill_random(&mut self, sections: usize, rng: &mut impl Rng) -> usize {
        let mut count = 0;
        for section in 0..sections.min(self.layout.sections) {
            for coord in self.coords_in_section(section) {
                self.place(coord, BubbleKind::Colored(BubbleColor::random_with(rng)));
                count += 1;
            }
        }
        count
    }

    /// Center of a cell; convenience passthrough to the layout.
    pub fn cell_center(&self, coord: GridCoord) -> Vec2 {
        self.layout.cell_center(coord)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::bubble::PowerKind;

    fn red() -> BubbleKind {
        BubbleKind::Colored(BubbleColor::Red)
    }

    #[test]
    fn test_get_set_roundtrip() {
        let mut grid = GridModel::default();
        let coord = GridCoord::new(3, 4);
        let id = grid.place(coord, red()).unwrap();

        assert!(grid.is_occupied(coord));
        assert_eq!(grid.get(coord).map(Bubble::id), Some(id));
        assert_eq!(grid.coord_of(id), Some(coord));
        assert_eq!(grid.len(), 1);

        let taken = grid.take(coord).unwrap();
        assert_eq!(taken.id(), id);
        assert!(grid.is_empty());
        assert_eq!(grid.coord_of(id), None);
    }

    #[test]
    fn test_out_of_range_is_a_no_op() {
        let mut grid = GridModel::default();
        let outside = GridCoord::new(1, 11);
        let bubble = grid.bubble_for(red(), GridCoord::new(0, 0));
        let id = bubble.id();

        let returned = grid.set(outside, Some(bubble));
        assert_eq!(returned.map(|b| b.id()), Some(id));
        assert!(grid.get(outside).is_none());
        assert!(grid.take(GridCoord::new(40, 0)).is_none());
        assert!(grid.place(outside, red()).is_none());
        assert!(grid.is_empty());
    }

    #[test]
    fn test_snapshot_is_independent() {
        let mut grid = GridModel::default();
        let coord = GridCoord::new(0, 2);
        let id = grid.place(coord, BubbleKind::Power(PowerKind::Bomb)).unwrap();

        let mut copy = grid.snapshot();
        let copied_id = copy.get(coord).map(Bubble::id).unwrap();
        assert_ne!(copied_id, id);
        assert_eq!(copy.get(coord).map(|b| b.kind), grid.get(coord).map(|b| b.kind));

        copy.take(coord);
        copy.place(GridCoord::new(5, 5), red());
        assert!(grid.is_occupied(coord));
        assert!(!grid.is_occupied(GridCoord::new(5, 5)));
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut grid = GridModel::default();
        grid.fill_random(3, &mut rand::rng());
        assert!(!grid.is_empty());

        grid.reset();
        let once = grid.occupied();
        grid.reset();
        assert_eq!(grid.occupied(), once);
        assert!(grid.is_empty());
        assert_eq!(grid.layout().slot_count(), GridLayout::default().slot_count());
    }

    #[test]
    fn test_section_queries() {
        let mut grid = GridModel::default();
        grid.place(GridCoord::new(1, 0), red());
        grid.place(GridCoord::new(1, 7), red());
        grid.place(GridCoord::new(4, 2), red());

        assert_eq!(grid.coords_in_section(1).len(), 11);
        assert_eq!(
            grid.occupied_in_section(1),
            vec![GridCoord::new(1, 0), GridCoord::new(1, 7)]
        );
        assert_eq!(grid.lowest_section(), Some(4));
        assert_eq!(grid.colors(), vec![BubbleColor::Red]);
    }
}
