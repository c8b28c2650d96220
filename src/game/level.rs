//! Level persistence.
//!
//! Levels are saved as JSON files in the user's data directory, one file per
//! named level. A file records the grid dimensions and one tag per slot in
//! flat-index order, so it only loads back into a grid of the same shape.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::{
    bubble::{BubbleColor, BubbleKind, PowerKind},
    grid::GridModel,
    hex::GridLayout,
    session::GameSession,
};

pub(super) fn plugin(app: &mut App) {
    app.init_resource::<LevelStore>();
    app.add_message::<SaveLevel>();
    app.add_message::<LoadLevel>();
    app.add_message::<LevelSaved>();
    app.add_message::<LevelLoaded>();

    app.add_systems(Update, (save_levels, load_levels));
}

/// Current level file format version.
pub const LEVEL_FORMAT_VERSION: u32 = 1;

/// Extension used for level files.
const LEVEL_EXTENSION: &str = "json";

/// Everything that can go wrong saving or loading a level.
#[derive(Debug)]
pub enum LevelError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    NoDataDir,
    InvalidName,
    UnsupportedVersion(u32),
    InvalidLayout,
    SlotCountMismatch { expected: usize, found: usize },
}

impl std::fmt::Display for LevelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "level file I/O failed: {e}"),
            Self::Parse(e) => write!(f, "level file is malformed: {e}"),
            Self::NoDataDir => write!(f, "could not determine data directory"),
            Self::InvalidName => write!(f, "level name is empty"),
            Self::UnsupportedVersion(v) => write!(f, "unsupported level format version {v}"),
            Self::InvalidLayout => write!(f, "level has an empty or inconsistent layout"),
            Self::SlotCountMismatch { expected, found } => {
                write!(f, "level has {found} slots, its layout needs {expected}")
            }
        }
    }
}

impl std::error::Error for LevelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Parse(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for LevelError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for LevelError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e)
    }
}

/// What one grid slot holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tag", rename_all = "snake_case")]
pub enum SlotTag {
    Empty,
    Colored { color: BubbleColor },
    Power { power: PowerKind },
}

impl From<Option<BubbleKind>> for SlotTag {
    fn from(kind: Option<BubbleKind>) -> Self {
        match kind {
            None => SlotTag::Empty,
            Some(BubbleKind::Colored(color)) => SlotTag::Colored { color },
            Some(BubbleKind::Power(power)) => SlotTag::Power { power },
        }
    }
}

impl SlotTag {
    pub fn kind(self) -> Option<BubbleKind> {
        match self {
            SlotTag::Empty => None,
            SlotTag::Colored { color } => Some(BubbleKind::Colored(color)),
            SlotTag::Power { power } => Some(BubbleKind::Power(power)),
        }
    }
}

/// On-disk representation of a level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelFile {
    pub name: String,
    pub version: u32,
    pub sections: usize,
    pub even_rows: usize,
    pub odd_rows: usize,
    pub slots: Vec<SlotTag>,
}

impl LevelFile {
    /// Capture a grid under a name.
    pub fn from_grid(name: &str, grid: &GridModel) -> Self {
        let layout = grid.layout();
        Self {
            name: name.to_string(),
            version: LEVEL_FORMAT_VERSION,
            sections: layout.sections,
            even_rows: layout.even_rows,
            odd_rows: layout.odd_rows,
            slots: layout
                .coords()
                .map(|coord| SlotTag::from(grid.get(coord).map(|bubble| bubble.kind)))
                .collect(),
        }
    }

    /// Rebuild a grid, validating the file first.
    pub fn to_grid(&self, cell_diameter: f32) -> Result<GridModel, LevelError> {
        if self.version != LEVEL_FORMAT_VERSION {
            return Err(LevelError::UnsupportedVersion(self.version));
        }
        if self.sections == 0 || self.even_rows == 0 || self.odd_rows > self.even_rows {
            return Err(LevelError::InvalidLayout);
        }

        let layout =
            GridLayout::with_odd_rows(self.sections, self.even_rows, self.odd_rows, cell_diameter);
        let expected = layout
            .checked_slot_count()
            .ok_or(LevelError::InvalidLayout)?;
        if self.slots.len() != expected {
            return Err(LevelError::SlotCountMismatch {
                expected,
                found: self.slots.len(),
            });
        }

        let mut grid = GridModel::new(layout);
        for (coord, tag) in layout.coords().zip(&self.slots) {
            if let Some(kind) = tag.kind() {
                grid.place(coord, kind);
            }
        }
        Ok(grid)
    }
}

/// Directory of saved levels.
#[derive(Resource, Debug, Clone)]
pub struct LevelStore {
    root: Option<PathBuf>,
}

impl Default for LevelStore {
    fn default() -> Self {
        Self {
            root: dirs::data_local_dir().map(|dir| dir.join("bubble-burst").join("levels")),
        }
    }
}

impl LevelStore {
    /// A store rooted at an explicit directory.
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Get the file path for storing a level.
    fn file_path(&self, name: &str) -> Result<PathBuf, LevelError> {
        let root = self.root.as_ref().ok_or(LevelError::NoDataDir)?;
        if name.trim().is_empty() {
            return Err(LevelError::InvalidName);
        }
        let safe: String = name
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        Ok(root.join(safe).with_extension(LEVEL_EXTENSION))
    }

    /// Save a grid under `name`.
    pub fn try_save(&self, name: &str, grid: &GridModel) -> Result<PathBuf, LevelError> {
        let path = self.file_path(name)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&LevelFile::from_grid(name, grid))?;
        fs::write(&path, json)?;
        Ok(path)
    }

    /// Load the level saved under `name`.
    pub fn try_load(&self, name: &str, cell_diameter: f32) -> Result<GridModel, LevelError> {
        let path = self.file_path(name)?;
        let contents = fs::read_to_string(&path)?;
        let file: LevelFile = serde_json::from_str(&contents)?;
        file.to_grid(cell_diameter)
    }

    /// Save a grid, logging failures. Returns whether it worked.
    pub fn save(&self, name: &str, grid: &GridModel) -> bool {
        match self.try_save(name, grid) {
            Ok(path) => {
                info!("Saved level {:?} to {:?}", name, path);
                true
            }
            Err(e) => {
                warn!("Failed to save level {:?}: {}", name, e);
                false
            }
        }
    }

    /// Load a level into `grid`. On any failure `grid` is left as it was.
    pub fn load(&self, name: &str, grid: &mut GridModel) -> bool {
        match self.try_load(name, grid.layout().cell_diameter) {
            Ok(loaded) => {
                info!("Loaded level {:?} ({} bubbles)", name, loaded.len());
                *grid = loaded;
                true
            }
            Err(e) => {
                warn!("Failed to load level {:?}: {}", name, e);
                false
            }
        }
    }

    /// Names of all saved levels, sorted.
    pub fn list(&self) -> Vec<String> {
        let Some(root) = self.root.as_ref() else {
            return Vec::new();
        };
        let Ok(entries) = fs::read_dir(root) else {
            return Vec::new();
        };

        let mut names: Vec<String> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == LEVEL_EXTENSION))
            .filter_map(|path| path.file_stem()?.to_str().map(str::to_string))
            .collect();
        names.sort();
        names
    }

    /// Delete a saved level. Returns whether a file was removed.
    pub fn delete(&self, name: &str) -> bool {
        let Ok(path) = self.file_path(name) else {
            return false;
        };
        match fs::remove_file(&path) {
            Ok(()) => {
                info!("Deleted level {:?}", name);
                true
            }
            Err(e) => {
                warn!("Failed to delete level {:?}: {}", name, e);
                false
            }
        }
    }
}

/// Request to save the live grid.
#[derive(Message, Debug, Clone)]
pub struct SaveLevel {
    pub name: String,
}

/// Request to replace the live grid with a saved level.
#[derive(Message, Debug, Clone)]
pub struct LoadLevel {
    pub name: String,
}

#[derive(Message, Debug, Clone)]
pub struct LevelSaved {
    pub name: String,
    pub ok: bool,
}

#[derive(Message, Debug, Clone)]
pub struct LevelLoaded {
    pub name: String,
    pub ok: bool,
}

fn save_levels(
    store: Res<LevelStore>,
    session: Res<GameSession>,
    mut requests: MessageReader<SaveLevel>,
    mut saved: MessageWriter<LevelSaved>,
) {
    for request in requests.read() {
        let ok = store.save(&request.name, session.grid());
        saved.write(LevelSaved {
            name: request.name.clone(),
            ok,
        });
    }
}

fn load_levels(
    store: Res<LevelStore>,
    mut session: ResMut<GameSession>,
    mut requests: MessageReader<LoadLevel>,
    mut loaded: MessageWriter<LevelLoaded>,
) {
    for request in requests.read() {
        let ok = session.load_level(&store, &request.name);
        loaded.write(LevelLoaded {
            name: request.name.clone(),
            ok,
        });
    }
}
