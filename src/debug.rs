//! Debug overlays for the bubble grid.
//!
//! Toggle the grid overlay with the 'D' key during play. F2 dumps the full
//! game snapshot as JSON to the log.

use bevy::{color::palettes::css, input::common_conditions::input_just_pressed, prelude::*};

use crate::{
    game::{
        cell::{BUBBLE_RADIUS, DescentOffset, GridCell},
        grid::BubbleGrid,
        session::GamePhase,
        snapshot::GameSnapshot,
    },
    view::playfield_to_world,
};

pub(crate) fn plugin(app: &mut App) {
    app.init_resource::<DebugGridVisible>();

    app.add_systems(
        Update,
        toggle_debug.run_if(in_state(GamePhase::Playing).and(input_just_pressed(KeyCode::KeyD))),
    );
    app.add_systems(
        Update,
        draw_debug_grid.run_if(in_state(GamePhase::Playing).and(debug_visible)),
    );
    app.add_systems(Update, dump_snapshot.run_if(input_just_pressed(KeyCode::F2)));
}

/// Resource to track if the grid overlay is visible.
#[derive(Resource, Default)]
pub struct DebugGridVisible(pub bool);

fn debug_visible(debug: Res<DebugGridVisible>) -> bool {
    debug.0
}

fn toggle_debug(mut debug: ResMut<DebugGridVisible>) {
    debug.0 = !debug.0;
    let state = if debug.0 { "ON" } else { "OFF" };
    info!("Debug grid: {}", state);
}

/// Outline every cell the grid could hold down to the lowest occupied row,
/// highlighting occupied ones.
fn draw_debug_grid(mut gizmos: Gizmos, grid: Res<BubbleGrid>, offset: Res<DescentOffset>) {
    let last_row = grid.lowest_row().unwrap_or(0) + 1;

    for row in 0..=last_row {
        for col in 0..GridCell::columns_in_row(row) {
            let cell = GridCell::new(row, col);
            let color = if grid.is_occupied(cell) {
                css::LIMEGREEN.with_alpha(0.5)
            } else if row == 0 {
                // The anchor row.
                css::GOLD.with_alpha(0.3)
            } else {
                css::WHITE.with_alpha(0.15)
            };

            let center = playfield_to_world(cell.to_pixel_with_offset(offset.y));
            gizmos.circle_2d(center, BUBBLE_RADIUS, color);
        }
    }
}

/// Log the current snapshot as JSON.
fn dump_snapshot(snapshot: Res<GameSnapshot>) {
    match serde_json::to_string_pretty(&*snapshot) {
        Ok(json) => info!("Snapshot:\n{json}"),
        Err(err) => error!("Snapshot serialization failed: {err}"),
    }
}
