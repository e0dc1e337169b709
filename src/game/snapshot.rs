//! A serializable snapshot of the whole game state.
//!
//! Rebuilt every frame in `PostUpdate`, after all gameplay systems have run.
//! The view reads live ECS data directly; the snapshot exists for anything
//! that wants the state as plain data, such as the debug JSON dump.

use bevy::prelude::*;
use serde::Serialize;

use super::{
    bubble::BubbleColor,
    cell::DescentOffset,
    grid::BubbleGrid,
    projectile::Projectile,
    session::{GamePhase, Session},
    shooter::ShooterQueue,
};

pub(super) fn plugin(app: &mut App) {
    app.init_resource::<GameSnapshot>();
    app.add_systems(PostUpdate, capture_snapshot);
}

/// One resting bubble, in descended playfield pixels.
#[derive(Debug, Clone, Serialize)]
pub struct BubbleSnapshot {
    /// Stable id for the bubble's lifetime (the entity's bits).
    pub id: u64,
    pub color: BubbleColor,
    pub x: f32,
    pub y: f32,
}

/// The in-flight projectile, if any.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectileSnapshot {
    pub color: BubbleColor,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
}

/// Full game state as plain data.
#[derive(Resource, Debug, Default, Serialize)]
pub struct GameSnapshot {
    pub phase: GamePhase,
    pub level: u32,
    pub score: u32,
    pub lives: u32,
    pub combo: u32,
    pub stars: u32,
    pub freeze_remaining: f32,
    pub time_remaining: Option<f32>,
    pub loaded_color: BubbleColor,
    pub next_color: BubbleColor,
    pub bubbles: Vec<BubbleSnapshot>,
    pub projectile: Option<ProjectileSnapshot>,
}

/// Snapshot every resting bubble, sorted by cell for stable output.
fn bubble_snapshots(grid: &BubbleGrid, descent_y: f32) -> Vec<BubbleSnapshot> {
    let mut entries: Vec<_> = grid.iter().collect();
    entries.sort_by_key(|(cell, _)| (cell.row, cell.col));
    entries
        .into_iter()
        .map(|(cell, slot)| {
            let pos = cell.to_pixel_with_offset(descent_y);
            BubbleSnapshot {
                id: slot.entity.to_bits(),
                color: slot.color,
                x: pos.x,
                y: pos.y,
            }
        })
        .collect()
}

/// Rebuild the snapshot from the live state.
fn capture_snapshot(
    mut snapshot: ResMut<GameSnapshot>,
    phase: Res<State<GamePhase>>,
    session: Res<Session>,
    grid: Res<BubbleGrid>,
    offset: Res<DescentOffset>,
    queue: Res<ShooterQueue>,
    projectiles: Query<&Projectile>,
) {
    *snapshot = GameSnapshot {
        phase: *phase.get(),
        level: session.level,
        score: session.score,
        lives: session.lives,
        combo: session.combo,
        stars: session.stars,
        freeze_remaining: session.freeze_remaining,
        time_remaining: session.time_remaining,
        loaded_color: queue.loaded,
        next_color: queue.next,
        bubbles: bubble_snapshots(&grid, offset.y),
        projectile: projectiles.iter().next().map(|p| ProjectileSnapshot {
            color: p.color,
            x: p.pos.x,
            y: p.pos.y,
            vx: p.velocity.x,
            vy: p.velocity.y,
        }),
    };
}
