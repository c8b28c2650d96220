//! Level designer - hand-editing a grid before saving it as a level.
//!
//! Every cell cycles through the same palette: empty, the four colors, then
//! the four power bubbles, then back to empty.

use bevy::log::debug;
use bevy::math::Vec2;
use rand::Rng;

use super::{
    bubble::{BubbleColor, BubbleKind, PowerKind},
    grid::GridModel,
    hex::{GridCoord, GridLayout},
};

/// Brush palette in cycling order. `None` is the eraser.
fn palette() -> impl Iterator<Item = Option<BubbleKind>> {
    std::iter::once(None)
        .chain(BubbleColor::ALL.into_iter().map(|c| Some(BubbleKind::Colored(c))))
        .chain(PowerKind::ALL.into_iter().map(|p| Some(BubbleKind::Power(p))))
}

/// Palette entry after `current`, wrapping around.
pub fn next_kind(current: Option<BubbleKind>) -> Option<BubbleKind> {
    let entries: Vec<Option<BubbleKind>> = palette().collect();
    let index = entries.iter().position(|entry| *entry == current).unwrap_or(0);
    entries[(index + 1) % entries.len()]
}

/// Editing session over a grid it owns.
#[derive(Debug)]
pub struct LevelDesigner {
    grid: GridModel,
    /// What `paint` puts down.
    pub brush: Option<BubbleKind>,
}

impl Default for LevelDesigner {
    fn default() -> Self {
        Self::new(GridLayout::default())
    }
}

impl LevelDesigner {
    pub fn new(layout: GridLayout) -> Self {
        Self::from_grid(GridModel::new(layout))
    }

    /// Edit an existing grid, e.g. one just loaded from disk.
    pub fn from_grid(grid: GridModel) -> Self {
        Self {
            grid,
            brush: Some(BubbleKind::Colored(BubbleColor::Red)),
        }
    }

    pub fn grid(&self) -> &GridModel {
        &self.grid
    }

    /// Finish editing and hand the grid back.
    pub fn into_grid(self) -> GridModel {
        self.grid
    }

    /// Put the current brush on a cell. Returns whether the cell exists.
    pub fn paint(&mut self, coord: GridCoord) -> bool {
        self.set(coord, self.brush)
    }

    /// Paint whichever cell is nearest to a play-field point.
    pub fn paint_at(&mut self, point: Vec2) -> Option<GridCoord> {
        let coord = self.grid.layout().nearest_coord(point)?;
        self.paint(coord).then_some(coord)
    }

    pub fn erase(&mut self, coord: GridCoord) -> bool {
        self.set(coord, None)
    }

    /// Advance a cell to the next palette entry. Returns what it holds now.
    pub fn cycle(&mut self, coord: GridCoord) -> Option<BubbleKind> {
        if !self.grid.layout().contains(coord) {
            return None;
        }
        let current = self.grid.get(coord).map(|bubble| bubble.kind);
        let next = next_kind(current);
        self.set(coord, next);
        next
    }

    /// Advance the brush to the next palette entry.
    pub fn cycle_brush(&mut self) -> Option<BubbleKind> {
        self.brush = next_kind(self.brush);
        self.brush
    }

    /// Clear the grid and fill the top `sections` with random colors.
    pub fn fill_random(&mut self, sections: usize, rng: &mut impl Rng) -> usize {
        self.grid.reset();
        self.grid.fill_random(sections, rng)
    }

    pub fn clear(&mut self) {
        self.grid.reset();
    }

    fn set(&mut self, coord: GridCoord, kind: Option<BubbleKind>) -> bool {
        if !self.grid.layout().contains(coord) {
            debug!("Designer ignoring out-of-range cell {}", coord);
            return false;
        }
        match kind {
            Some(kind) => {
                self.grid.place(coord, kind);
            }
            None => {
                self.grid.take(coord);
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn test_cycle_walks_whole_palette() {
        let mut designer = LevelDesigner::default();
        let coord = GridCoord::new(2, 3);

        let mut seen = Vec::new();
        for _ in 0..9 {
            seen.push(designer.cycle(coord));
        }
        assert_eq!(seen[0], Some(BubbleKind::Colored(BubbleColor::Red)));
        assert_eq!(seen[4], Some(BubbleKind::Power(PowerKind::Indestructible)));
        assert_eq!(seen[7], Some(BubbleKind::Power(PowerKind::Star)));
        assert_eq!(seen[8], None);
        assert!(!designer.grid().is_occupied(coord));
    }

    #[test]
    fn test_paint_and_erase() {
        let mut designer = LevelDesigner::default();
        designer.brush = Some(BubbleKind::Power(PowerKind::Bomb));
        assert!(designer.paint(GridCoord::new(0, 0)));
        assert_eq!(
            designer.grid().get(GridCoord::new(0, 0)).map(|b| b.kind),
            Some(BubbleKind::Power(PowerKind::Bomb))
        );

        assert!(designer.erase(GridCoord::new(0, 0)));
        assert!(designer.grid().is_empty());

        // Odd sections are one cell shorter.
        assert!(!designer.paint(GridCoord::new(1, 11)));
    }

    #[test]
    fn test_paint_at_point_uses_nearest_cell() {
        let mut designer = LevelDesigner::default();
        let target = GridCoord::new(3, 4);
        let point = designer.grid().cell_center(target) + Vec2::new(3.0, -2.0);
        assert_eq!(designer.paint_at(point), Some(target));
        assert!(designer.grid().is_occupied(target));
    }

    #[test]
    fn test_fill_random_replaces_contents() {
        let mut designer = LevelDesigner::default();
        designer.paint(GridCoord::new(9, 0));
        let mut rng = StdRng::seed_from_u64(5);

        let placed = designer.fill_random(2, &mut rng);
        assert_eq!(placed, 12 + 11);
        assert_eq!(designer.grid().len(), 23);
        assert!(!designer.grid().is_occupied(GridCoord::new(9, 0)));
    }

    #[test]
    fn test_brush_cycles_through_eraser() {
        let mut designer = LevelDesigner::default();
        for _ in 0..7 {
            designer.cycle_brush();
        }
        assert_eq!(designer.brush, Some(BubbleKind::Power(PowerKind::Star)));
        assert_eq!(designer.cycle_brush(), None);
    }
}
