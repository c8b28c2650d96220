//! Staggered grid coordinate system.
//!
//! The play field is a stack of *sections* (horizontal row-groups). Even
//! sections are full width; odd sections are shifted right by half a cell,
//! usually hold one cell fewer, and sit closer to the section above so the
//! bubbles pack like a honeycomb. This is the classic bubble shooter layout.
//!
//! Cells are stored in one flat sequence, section after section. The
//! mapping from `(section, row)` to a flat index is closed-form and must not
//! change, otherwise saved levels stop loading.

use bevy::math::Vec2;
use bevy::reflect::Reflect;
use serde::{Deserialize, Serialize};

/// Square root of 3, used for the vertical packing of sections.
pub const SQRT_3: f32 = 1.732_050_8;

/// Default number of sections on the play field.
pub const DEFAULT_SECTIONS: usize = 12;

/// Default number of cells in an even section.
pub const DEFAULT_EVEN_ROWS: usize = 12;

/// Default cell diameter in play-field units.
pub const DEFAULT_CELL_DIAMETER: f32 = 32.0;

/// A logical cell coordinate.
///
/// - `section` is the row-group, 0 at the top wall
/// - `row` is the position inside the section, 0 at the left wall
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Reflect, Serialize, Deserialize,
)]
pub struct GridCoord {
    pub section: usize,
    pub row: usize,
}

impl GridCoord {
    /// Create a new coordinate.
    pub const fn new(section: usize, row: usize) -> Self {
        Self { section, row }
    }

    /// Whether this coordinate lies in an odd (offset) section.
    #[inline]
    pub const fn is_odd_section(&self) -> bool {
        self.section % 2 == 1
    }
}

impl std::fmt::Display for GridCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.section, self.row)
    }
}

/// Dimensions and geometry of a staggered grid.
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct GridLayout {
    /// Number of sections, top to bottom.
    pub sections: usize,
    /// Cells in each even section.
    pub even_rows: usize,
    /// Cells in each odd section.
    pub odd_rows: usize,
    /// Diameter of one cell (and of a snapped bubble).
    pub cell_diameter: f32,
}

impl Default for GridLayout {
    fn default() -> Self {
        Self::new(DEFAULT_SECTIONS, DEFAULT_EVEN_ROWS, DEFAULT_CELL_DIAMETER)
    }
}

impl GridLayout {
    /// A layout whose odd sections are one cell narrower than the even ones.
    pub fn new(sections: usize, even_rows: usize, cell_diameter: f32) -> Self {
        Self {
            sections,
            even_rows,
            odd_rows: even_rows.saturating_sub(1),
            cell_diameter,
        }
    }

    /// A layout with explicit odd-section width, as read back from a level file.
    pub fn with_odd_rows(
        sections: usize,
        even_rows: usize,
        odd_rows: usize,
        cell_diameter: f32,
    ) -> Self {
        Self {
            sections,
            even_rows,
            odd_rows,
            cell_diameter,
        }
    }

    /// Number of even sections (0, 2, 4, ...).
    pub fn even_sections(&self) -> usize {
        self.sections.div_ceil(2)
    }

    /// Number of odd sections (1, 3, 5, ...).
    pub fn odd_sections(&self) -> usize {
        self.sections / 2
    }

    /// Total slot count: `even_rows * even_sections + odd_rows * odd_sections`.
    pub fn slot_count(&self) -> usize {
        self.even_rows * self.even_sections() + self.odd_rows * self.odd_sections()
    }

    /// [`GridLayout::slot_count`] for untrusted dimensions; `None` on overflow.
    pub fn checked_slot_count(&self) -> Option<usize> {
        let even = self.even_rows.checked_mul(self.even_sections())?;
        let odd = self.odd_rows.checked_mul(self.odd_sections())?;
        even.checked_add(odd)
    }

    /// Cells in the given section, 0 if the section is out of range.
    pub fn rows_in(&self, section: usize) -> usize {
        if section >= self.sections {
            0
        } else if section % 2 == 0 {
            self.even_rows
        } else {
            self.odd_rows
        }
    }

    /// Index of the bottom section. Bubbles here mean the player lost.
    pub fn last_section(&self) -> usize {
        self.sections.saturating_sub(1)
    }

    /// Whether the coordinate addresses a real cell.
    #[inline]
    pub fn contains(&self, coord: GridCoord) -> bool {
        coord.row < self.rows_in(coord.section)
    }

    /// Flat index of a coordinate, `None` when out of range.
    pub fn index_of(&self, coord: GridCoord) -> Option<usize> {
        if !self.contains(coord) {
            return None;
        }
        let s = coord.section;
        // Sections above `s`: ceil(s/2) even ones and floor(s/2) odd ones.
        let before = s.div_ceil(2) * self.even_rows + (s / 2) * self.odd_rows;
        Some(before + coord.row)
    }

    /// Coordinate stored at a flat index, `None` past the end.
    pub fn coord_at(&self, index: usize) -> Option<GridCoord> {
        let mut remaining = index;
        for section in 0..self.sections {
            let rows = self.rows_in(section);
            if remaining < rows {
                return Some(GridCoord::new(section, remaining));
            }
            remaining -= rows;
        }
        None
    }

    /// Every valid coordinate in flat-index order.
    pub fn coords(&self) -> impl Iterator<Item = GridCoord> + '_ {
        (0..self.sections)
            .flat_map(move |section| (0..self.rows_in(section)).map(move |row| GridCoord::new(section, row)))
    }

    /// Coordinates of one section, left to right. Empty when out of range.
    pub fn coords_in_section(&self, section: usize) -> Vec<GridCoord> {
        (0..self.rows_in(section))
            .map(|row| GridCoord::new(section, row))
            .collect()
    }

    /// Up to 6 adjacent coordinates.
    ///
    /// Order: same section left/right, section above (two diagonals), section
    /// below (two diagonals). An odd cell `r` sits between even cells `r` and
    /// `r + 1`, so the diagonal offsets depend on parity. Coordinates falling
    /// off the grid are skipped.
    pub fn neighbors(&self, coord: GridCoord) -> Vec<GridCoord> {
        if !self.contains(coord) {
            return Vec::new();
        }

        let s = coord.section as isize;
        let r = coord.row as isize;
        let diagonals: [isize; 2] = if coord.is_odd_section() { [0, 1] } else { [-1, 0] };

        let candidates = [
            (s, r - 1),
            (s, r + 1),
            (s - 1, r + diagonals[0]),
            (s - 1, r + diagonals[1]),
            (s + 1, r + diagonals[0]),
            (s + 1, r + diagonals[1]),
        ];

        candidates
            .into_iter()
            .filter_map(|(s, r)| self.checked(s, r))
            .collect()
    }

    fn checked(&self, section: isize, row: isize) -> Option<GridCoord> {
        if section < 0 || row < 0 {
            return None;
        }
        let coord = GridCoord::new(section as usize, row as usize);
        self.contains(coord).then_some(coord)
    }

    /// Radius of a snapped bubble.
    #[inline]
    pub fn bubble_radius(&self) -> f32 {
        self.cell_diameter * 0.5
    }

    /// Vertical distance between the centers of consecutive sections.
    #[inline]
    pub fn section_height(&self) -> f32 {
        self.cell_diameter * SQRT_3 * 0.5
    }

    /// Center of a cell in play-field space.
    pub fn cell_center(&self, coord: GridCoord) -> Vec2 {
        let radius = self.bubble_radius();
        let offset = if coord.is_odd_section() { radius } else { 0.0 };
        Vec2::new(
            radius + offset + coord.row as f32 * self.cell_diameter,
            radius + coord.section as f32 * self.section_height(),
        )
    }

    /// Width of the play field (one full even section).
    pub fn field_width(&self) -> f32 {
        self.even_rows as f32 * self.cell_diameter
    }

    /// Height of the play field, down to the bottom edge of the last section.
    pub fn field_height(&self) -> f32 {
        self.cell_diameter + self.last_section() as f32 * self.section_height()
    }

    /// Nearest valid cell to a point, clamped onto the grid.
    ///
    /// Returns `None` only for an empty layout.
    pub fn nearest_coord(&self, point: Vec2) -> Option<GridCoord> {
        if self.slot_count() == 0 {
            return None;
        }
        let radius = self.bubble_radius();
        let section = ((point.y - radius) / self.section_height()).round().max(0.0) as usize;

        // The rounded section may be empty (odd_rows == 0), so look at it and its
        // neighbors and keep the closest candidate.
        let lo = section.saturating_sub(1).min(self.last_section());
        let hi = (section + 1).min(self.last_section());
        (lo..=hi)
            .filter(|&s| self.rows_in(s) > 0)
            .map(|s| {
                let offset = if s % 2 == 1 { radius } else { 0.0 };
                let row = ((point.x - radius - offset) / self.cell_diameter)
                    .round()
                    .clamp(0.0, (self.rows_in(s) - 1) as f32) as usize;
                GridCoord::new(s, row)
            })
            .min_by(|a, b| {
                let da = self.cell_center(*a).distance_squared(point);
                let db = self.cell_center(*b).distance_squared(point);
                da.total_cmp(&db)
            })
    }
}
