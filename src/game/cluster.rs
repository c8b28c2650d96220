//! Match resolution - what happens after a bubble snaps into the grid.
//!
//! One pass runs three phases in order:
//! 1. Special activation: power bubbles next to the snapped colored bubble
//!    go off, and can set each other off (a *chain*).
//! 2. Cluster pop: flood fill (BFS) from the snapped bubble over same-colored
//!    neighbors; 3+ connected bubbles pop.
//! 3. Floating drop: everything no longer connected to the top section falls.
//!
//! Indestructible bubbles survive every phase.

use std::collections::{HashSet, VecDeque};

use bevy::log::{debug, info};

use super::{
    bubble::{Bubble, BubbleColor, BubbleId, PowerKind},
    grid::GridModel,
    hex::GridCoord,
};

/// Minimum cluster size to pop (match-3).
pub const MIN_CLUSTER_SIZE: usize = 3;

/// Receives removal notifications, e.g. to play the matching animation.
///
/// Purely observational: the resolver never waits on the sink. `coord` is
/// the cell the bubble was removed from.
pub trait RemovalSink {
    /// A floating bubble fell off.
    fn dropped(&mut self, coord: GridCoord, bubble: &Bubble);
    /// A bubble popped as part of a cluster.
    fn popped(&mut self, coord: GridCoord, bubble: &Bubble);
    /// A cell was cleared by lightning.
    fn lightning_flash(&mut self, coord: GridCoord);
    /// A bubble was caught in a bomb blast.
    fn bomb_exploded(&mut self, coord: GridCoord, bubble: &Bubble);
    /// A cell was cleared by a star.
    fn star_destroyed(&mut self, coord: GridCoord);
}

/// A sink that ignores everything, for speculative passes.
impl RemovalSink for () {
    fn dropped(&mut self, _: GridCoord, _: &Bubble) {}
    fn popped(&mut self, _: GridCoord, _: &Bubble) {}
    fn lightning_flash(&mut self, _: GridCoord) {}
    fn bomb_exploded(&mut self, _: GridCoord, _: &Bubble) {}
    fn star_destroyed(&mut self, _: GridCoord) {}
}

/// A removal notification as plain data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RemovalEffect {
    Drop { coord: GridCoord, bubble: BubbleId },
    Pop { coord: GridCoord, bubble: BubbleId },
    LightningFlash { coord: GridCoord },
    BombExplode { coord: GridCoord, bubble: BubbleId },
    StarDestroy { coord: GridCoord },
}

impl RemovalEffect {
    pub fn coord(&self) -> GridCoord {
        match *self {
            RemovalEffect::Drop { coord, .. }
            | RemovalEffect::Pop { coord, .. }
            | RemovalEffect::LightningFlash { coord }
            | RemovalEffect::BombExplode { coord, .. }
            | RemovalEffect::StarDestroy { coord } => coord,
        }
    }
}

/// Collects notifications for later delivery.
impl RemovalSink for Vec<RemovalEffect> {
    fn dropped(&mut self, coord: GridCoord, bubble: &Bubble) {
        self.push(RemovalEffect::Drop {
            coord,
            bubble: bubble.id(),
        });
    }

    fn popped(&mut self, coord: GridCoord, bubble: &Bubble) {
        self.push(RemovalEffect::Pop {
            coord,
            bubble: bubble.id(),
        });
    }

    fn lightning_flash(&mut self, coord: GridCoord) {
        self.push(RemovalEffect::LightningFlash { coord });
    }

    fn bomb_exploded(&mut self, coord: GridCoord, bubble: &Bubble) {
        self.push(RemovalEffect::BombExplode {
            coord,
            bubble: bubble.id(),
        });
    }

    fn star_destroyed(&mut self, coord: GridCoord) {
        self.push(RemovalEffect::StarDestroy { coord });
    }
}

/// What one resolution pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchOutcome {
    /// Bubbles removed by special activation.
    pub special_removed: usize,
    /// Bubbles removed by the cluster pop.
    pub cluster_removed: usize,
    /// Bubbles removed because they were floating.
    pub floating_removed: usize,
    /// Specials set off after the first one in this pass.
    pub chain: usize,
    /// Whether the snapped bubble itself is gone.
    pub snapped_cleared: bool,
    /// Color of the snapped bubble, if it was colored.
    pub color: Option<BubbleColor>,
}

impl MatchOutcome {
    /// Total bubbles removed across all phases.
    pub fn removed(&self) -> usize {
        self.special_removed + self.cluster_removed + self.floating_removed
    }
}

/// Runs resolution passes. The working sets are reset at the start of each pass.
#[derive(Debug, Default)]
pub struct MatchResolver {
    activated: HashSet<GridCoord>,
    to_remove: HashSet<GridCoord>,
    chain: usize,
}

impl MatchResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the bubble that just snapped at `start`.
    pub fn resolve(
        &mut self,
        grid: &mut GridModel,
        start: GridCoord,
        sink: &mut impl RemovalSink,
    ) -> MatchOutcome {
        self.activated.clear();
        self.to_remove.clear();
        self.chain = 0;

        let color = grid.get(start).and_then(Bubble::color);
        let mut outcome = MatchOutcome {
            color,
            ..Default::default()
        };

        // Phase 1: special activation, only when a colored bubble landed.
        if let Some(color) = color {
            let roots: Vec<(GridCoord, PowerKind)> = grid
                .neighbors(start)
                .into_iter()
                .filter_map(|coord| {
                    let bubble = grid.get(coord)?;
                    bubble.is_special().then_some((coord, bubble.power_kind()?))
                })
                .collect();

            for (coord, power) in roots {
                outcome.special_removed += self.activate(grid, coord, power, color, sink);
            }
        }
        outcome.chain = self.chain;

        // Phase 2: cluster pop, skipped if the snapped bubble is already gone.
        if !self.to_remove.contains(&start)
            && let Some(color) = grid.get(start).and_then(Bubble::color)
        {
            let cluster = find_cluster(grid, start, color);
            if cluster.len() >= MIN_CLUSTER_SIZE {
                info!(
                    "Found cluster of {} {:?} bubbles at {}",
                    cluster.len(),
                    color,
                    start
                );
                for coord in cluster {
                    if let Some(bubble) = self.remove(grid, coord) {
                        sink.popped(coord, &bubble);
                        outcome.cluster_removed += 1;
                    }
                }
            }
        }

        // Phase 3: floating drop, always runs.
        let anchored = find_anchored_bubbles(grid);
        let floating: Vec<GridCoord> = grid
            .iter()
            .filter(|(coord, bubble)| !anchored.contains(coord) && !bubble.is_indestructible())
            .map(|(coord, _)| coord)
            .collect();
        if !floating.is_empty() {
            info!("Found {} floating bubbles to remove", floating.len());
        }
        for coord in floating {
            if let Some(bubble) = self.remove(grid, coord) {
                sink.dropped(coord, &bubble);
                outcome.floating_removed += 1;
            }
        }

        outcome.snapped_cleared = self.to_remove.contains(&start);
        outcome
    }

    /// State-free what-if pass: resolve against a copy and report how many
    /// bubbles would go. The given grid is left untouched.
    pub fn simulate(grid: &GridModel, start: GridCoord) -> usize {
        let mut copy = grid.snapshot();
        MatchResolver::new().resolve(&mut copy, start, &mut ()).removed()
    }

    /// Set off a special and everything it chains into.
    ///
    /// Iterative worklist; `activated` is the visited set so two specials
    /// caught in each other's blast only go off once.
    fn activate(
        &mut self,
        grid: &mut GridModel,
        root: GridCoord,
        power: PowerKind,
        color: BubbleColor,
        sink: &mut impl RemovalSink,
    ) -> usize {
        if !self.activated.insert(root) {
            return 0;
        }
        // A second root next to the snapped bubble extends the chain too.
        if self.activated.len() > 1 {
            self.chain += 1;
        }

        let mut removed = 0;
        let mut worklist = vec![(root, power)];

        while let Some((coord, power)) = worklist.pop() {
            debug!("Activating {:?} at {}", power, coord);
            let targets: Vec<GridCoord> = match power {
                PowerKind::Lightning => grid.coords_in_section(coord.section),
                PowerKind::Bomb => {
                    let mut blast = grid.neighbors(coord);
                    blast.push(coord);
                    blast
                }
                PowerKind::Star => {
                    let mut matching: Vec<GridCoord> = grid
                        .iter()
                        .filter(|(_, bubble)| bubble.color() == Some(color))
                        .map(|(coord, _)| coord)
                        .collect();
                    matching.push(coord);
                    matching
                }
                PowerKind::Indestructible => Vec::new(),
            };

            for target in targets {
                if grid.get(target).is_none_or(Bubble::is_indestructible) {
                    continue;
                }
                let Some(bubble) = self.remove(grid, target) else {
                    continue;
                };
                removed += 1;

                match power {
                    PowerKind::Lightning => sink.lightning_flash(target),
                    PowerKind::Bomb => sink.bomb_exploded(target, &bubble),
                    PowerKind::Star => sink.star_destroyed(target),
                    PowerKind::Indestructible => {}
                }

                // Stars do not chain.
                if power == PowerKind::Star {
                    continue;
                }
                if let Some(next) = bubble.power_kind()
                    && bubble.is_special()
                    && self.activated.insert(target)
                {
                    self.chain += 1;
                    info!("Chain x{}: {:?} at {} set off {:?}", self.chain, power, coord, next);
                    worklist.push((target, next));
                }
            }
        }

        removed
    }

    fn remove(&mut self, grid: &mut GridModel, coord: GridCoord) -> Option<Bubble> {
        let bubble = grid.take(coord)?;
        self.to_remove.insert(coord);
        Some(bubble)
    }
}

/// Find all connected bubbles of the same color using flood fill (BFS).
///
/// The start cell is always part of the result.
pub fn find_cluster(grid: &GridModel, start: GridCoord, target_color: BubbleColor) -> Vec<GridCoord> {
    let mut cluster = vec![start];
    let mut visited = HashSet::from([start]);
    let mut queue = VecDeque::from([start]);

    while let Some(coord) = queue.pop_front() {
        for neighbor in grid.neighbors(coord) {
            if !visited.insert(neighbor) {
                continue;
            }
            if grid.get(neighbor).and_then(Bubble::color) == Some(target_color) {
                cluster.push(neighbor);
                queue.push_back(neighbor);
            }
        }
    }

    cluster
}

/// Find all bubbles connected to the top section using BFS.
pub fn find_anchored_bubbles(grid: &GridModel) -> HashSet<GridCoord> {
    let top = grid.occupied_in_section(0);
    let mut anchored: HashSet<GridCoord> = top.iter().copied().collect();
    let mut queue: VecDeque<GridCoord> = top.into_iter().collect();

    while let Some(coord) = queue.pop_front() {
        for neighbor in grid.neighbors(coord) {
            if grid.is_occupied(neighbor) && anchored.insert(neighbor) {
                queue.push_back(neighbor);
            }
        }
    }

    anchored
}
