//! Landing resolution - matching, specials, floating cleanup, win check.
//!
//! Runs once per landed bubble, after the projectile systems. The grid
//! mutation lives in [`resolve_landing`], a pure function over the grid, so
//! every branch of the pipeline is testable without an app. The ECS system
//! around it despawns entities, applies scoring, and flips the phase.

use bevy::prelude::*;

use super::{
    bubble::{Bubble, BubbleColor},
    cell::GridCell,
    cluster::{MIN_CLUSTER_SIZE, find_cluster, find_floating},
    grid::{BubbleGrid, BubbleSlot},
    level::LevelConfig,
    projectile::{BubbleLanded, ProjectileSystems},
    session::{FREEZE_DURATION, GamePhase, Session},
};

pub(super) fn plugin(app: &mut App) {
    app.add_systems(
        Update,
        resolve_landed
            .after(ProjectileSystems)
            .run_if(in_state(GamePhase::Playing)),
    );
}

/// What a landing did to the grid. Removed cells carry their slots so the
/// caller can despawn the entities.
#[derive(Debug)]
pub enum LandingOutcome {
    /// A match or a bomb removed bubbles; floaters are detached by that
    /// removal and go too.
    Cleared {
        popped: Vec<(GridCell, BubbleSlot)>,
        floating: Vec<(GridCell, BubbleSlot)>,
    },
    /// Nothing cleared; the bubble stays put. A rainbow that found no match
    /// keeps the hue it adopted.
    Stuck { adopted: Option<BubbleColor> },
    /// A freeze bubble never joins the grid; it suspends descent instead.
    Frozen,
}

/// Remove the given cells from the grid, keeping their slots.
fn take_cells(grid: &mut BubbleGrid, cells: impl IntoIterator<Item = GridCell>) -> Vec<(GridCell, BubbleSlot)> {
    cells
        .into_iter()
        .filter_map(|cell| grid.remove(cell).map(|slot| (cell, slot)))
        .collect()
}

/// Everything no longer anchored after a removal.
fn sweep_floating(grid: &mut BubbleGrid) -> Vec<(GridCell, BubbleSlot)> {
    let floating = find_floating(grid);
    take_cells(grid, floating)
}

/// Resolve a just-landed bubble against the grid.
///
/// The landed bubble is already in the grid at `cell`. `struck` is the color
/// of the resting bubble it touched, if any; a rainbow adopts it, or
/// `rainbow_fallback` when it landed at the ceiling or against something
/// unadoptable.
pub fn resolve_landing(
    grid: &mut BubbleGrid,
    cell: GridCell,
    color: BubbleColor,
    struck: Option<BubbleColor>,
    rainbow_fallback: BubbleColor,
) -> LandingOutcome {
    match color {
        BubbleColor::Bomb => {
            let blast = std::iter::once(cell).chain(cell.neighbors());
            let popped = take_cells(grid, blast);
            let floating = sweep_floating(grid);
            LandingOutcome::Cleared { popped, floating }
        }
        BubbleColor::Freeze => {
            grid.remove(cell);
            LandingOutcome::Frozen
        }
        BubbleColor::Rainbow => {
            let adopted = struck
                .filter(|c| !c.is_obstacle() && !c.is_special())
                .unwrap_or(rainbow_fallback);
            grid.recolor(cell, adopted);
            resolve_match(grid, cell, adopted, Some(adopted))
        }
        _ => resolve_match(grid, cell, color, None),
    }
}

/// The standard match-3 branch.
fn resolve_match(
    grid: &mut BubbleGrid,
    cell: GridCell,
    color: BubbleColor,
    adopted: Option<BubbleColor>,
) -> LandingOutcome {
    let cluster = find_cluster(grid, cell, color);
    if cluster.len() < MIN_CLUSTER_SIZE {
        return LandingOutcome::Stuck { adopted };
    }

    let popped = take_cells(grid, cluster);
    let floating = sweep_floating(grid);
    LandingOutcome::Cleared { popped, floating }
}

/// Apply a landing's outcome to the session and the ECS.
fn resolve_landed(
    mut commands: Commands,
    mut landed_events: MessageReader<BubbleLanded>,
    mut grid: ResMut<BubbleGrid>,
    mut session: ResMut<Session>,
    mut bubbles: Query<&mut Bubble>,
    mut next_phase: ResMut<NextState<GamePhase>>,
) {
    for event in landed_events.read() {
        let config = LevelConfig::get(session.level);
        let fallback = BubbleColor::random_from(BubbleColor::palette(config));
        let outcome = resolve_landing(&mut grid, event.cell, event.color, event.struck, fallback);

        match outcome {
            LandingOutcome::Cleared { popped, floating } => {
                let points = session.apply_clear(popped.len(), floating.len());
                info!(
                    "Cleared {} bubbles ({} floating) for {points} points, combo {}",
                    popped.len() + floating.len(),
                    floating.len(),
                    session.combo,
                );
                for (_, slot) in popped.iter().chain(floating.iter()) {
                    commands.entity(slot.entity).despawn();
                }

                let remaining = grid.remaining_colored();
                if remaining == 0 {
                    let bonus = session.apply_win(remaining as u32);
                    info!(
                        "Level {} won with {} stars (+{bonus})",
                        session.level, session.stars
                    );
                    next_phase.set(GamePhase::Won);
                }
            }
            LandingOutcome::Stuck { adopted } => {
                session.apply_miss();
                if let Some(color) = adopted
                    && let Ok(mut bubble) = bubbles.get_mut(event.entity)
                {
                    bubble.color = color;
                }
            }
            LandingOutcome::Frozen => {
                commands.entity(event.entity).despawn();
                session.freeze_remaining = FREEZE_DURATION;
                info!("Descent frozen for {FREEZE_DURATION} seconds");
            }
        }
    }
}
