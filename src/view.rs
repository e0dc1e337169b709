//! Rendering and input on top of the headless game core.
//!
//! The core tracks everything in playfield pixels (y-down, origin at the top
//! left of the field); this module converts to world coordinates, attaches
//! circle meshes to bubbles, and turns mouse and keyboard input into the
//! core's messages. Nothing in here mutates game state directly.

use std::collections::HashMap;

use bevy::{
    color::palettes::css, input::common_conditions::input_just_pressed, prelude::*,
    window::PrimaryWindow,
};

use crate::game::{
    bubble::{Bubble, BubbleColor},
    cell::{BUBBLE_RADIUS, DescentOffset, FIELD_HEIGHT, FIELD_WIDTH, GridCell},
    projectile::Projectile,
    session::{AdvanceLevel, DANGER_LINE_Y, GamePhase, RetryLevel, Session, StartGame},
    shooter::{FireRequest, ShooterQueue, shooter_position},
};

pub(crate) fn plugin(app: &mut App) {
    app.init_resource::<CursorAim>();
    app.add_systems(Startup, setup);
    app.add_systems(
        Update,
        (
            attach_bubble_visuals,
            recolor_bubbles,
            sync_bubble_transforms,
            attach_projectile_visuals,
            sync_projectile_transforms,
            update_hud,
        ),
    );
    app.add_systems(
        Update,
        (track_cursor, fire_on_click, draw_playfield).run_if(in_state(GamePhase::Playing)),
    );
    app.add_systems(
        Update,
        (
            start_on_space.run_if(in_state(GamePhase::Menu)),
            advance_on_space.run_if(in_state(GamePhase::Won)),
            retry_on_space.run_if(in_state(GamePhase::Lost)),
        )
            .run_if(input_just_pressed(KeyCode::Space)),
    );
}

/// Playfield pixels to world coordinates (field centered on the origin).
pub fn playfield_to_world(p: Vec2) -> Vec2 {
    Vec2::new(p.x - FIELD_WIDTH / 2.0, FIELD_HEIGHT / 2.0 - p.y)
}

/// World coordinates back to playfield pixels.
pub fn world_to_playfield(w: Vec2) -> Vec2 {
    Vec2::new(w.x + FIELD_WIDTH / 2.0, FIELD_HEIGHT / 2.0 - w.y)
}

/// Shared circle mesh and one material per bubble color.
#[derive(Resource)]
struct ViewAssets {
    circle: Handle<Mesh>,
    materials: HashMap<BubbleColor, Handle<ColorMaterial>>,
}

impl ViewAssets {
    fn material(&self, color: BubbleColor) -> Handle<ColorMaterial> {
        self.materials
            .get(&color)
            .cloned()
            .unwrap_or_default()
    }
}

/// Last known cursor position, in playfield pixels.
#[derive(Resource, Default)]
struct CursorAim(Option<Vec2>);

/// Marker for the HUD text node.
#[derive(Component)]
struct Hud;

const ALL_COLORS: [BubbleColor; 12] = [
    BubbleColor::Red,
    BubbleColor::Blue,
    BubbleColor::Green,
    BubbleColor::Yellow,
    BubbleColor::Purple,
    BubbleColor::Orange,
    BubbleColor::Cyan,
    BubbleColor::Pink,
    BubbleColor::Rainbow,
    BubbleColor::Bomb,
    BubbleColor::Freeze,
    BubbleColor::Gray,
];

fn setup(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<ColorMaterial>>,
) {
    commands.spawn((Name::new("Camera"), Camera2d));

    let circle = meshes.add(Circle::new(BUBBLE_RADIUS));
    let materials = ALL_COLORS
        .into_iter()
        .map(|color| (color, materials.add(ColorMaterial::from(color.to_color()))))
        .collect();
    commands.insert_resource(ViewAssets { circle, materials });

    commands.spawn((
        Name::new("Hud"),
        Hud,
        Text::new("Color Burst - press Space"),
        TextFont {
            font_size: 18.0,
            ..default()
        },
        Node {
            position_type: PositionType::Absolute,
            top: Val::Px(8.0),
            left: Val::Px(8.0),
            ..default()
        },
    ));
}

/// Give every new resting bubble a circle mesh in its color.
fn attach_bubble_visuals(
    mut commands: Commands,
    assets: Res<ViewAssets>,
    offset: Res<DescentOffset>,
    new_bubbles: Query<(Entity, &Bubble, &GridCell), Added<Bubble>>,
) {
    for (entity, bubble, cell) in &new_bubbles {
        let pos = playfield_to_world(cell.to_pixel_with_offset(offset.y));
        commands.entity(entity).insert((
            Mesh2d(assets.circle.clone()),
            MeshMaterial2d(assets.material(bubble.color)),
            Transform::from_translation(pos.extend(0.0)),
        ));
    }
}

/// Swap the material when a bubble's color changes (rainbow adoption).
fn recolor_bubbles(
    assets: Res<ViewAssets>,
    mut changed: Query<(&Bubble, &mut MeshMaterial2d<ColorMaterial>), Changed<Bubble>>,
) {
    for (bubble, mut material) in &mut changed {
        material.0 = assets.material(bubble.color);
    }
}

/// Keep resting bubbles at their descended cell positions.
fn sync_bubble_transforms(
    offset: Res<DescentOffset>,
    mut bubbles: Query<(&GridCell, &mut Transform), With<Bubble>>,
) {
    for (cell, mut transform) in &mut bubbles {
        let pos = playfield_to_world(cell.to_pixel_with_offset(offset.y));
        transform.translation.x = pos.x;
        transform.translation.y = pos.y;
    }
}

fn attach_projectile_visuals(
    mut commands: Commands,
    assets: Res<ViewAssets>,
    new_projectiles: Query<(Entity, &Projectile), Added<Projectile>>,
) {
    for (entity, projectile) in &new_projectiles {
        let pos = playfield_to_world(projectile.pos);
        commands.entity(entity).insert((
            Mesh2d(assets.circle.clone()),
            MeshMaterial2d(assets.material(projectile.color)),
            Transform::from_translation(pos.extend(1.0)),
        ));
    }
}

fn sync_projectile_transforms(mut projectiles: Query<(&Projectile, &mut Transform)>) {
    for (projectile, mut transform) in &mut projectiles {
        let pos = playfield_to_world(projectile.pos);
        transform.translation.x = pos.x;
        transform.translation.y = pos.y;
    }
}

/// Track the cursor in playfield pixels.
fn track_cursor(
    window_query: Query<&Window, With<PrimaryWindow>>,
    camera_query: Query<(&Camera, &GlobalTransform)>,
    mut aim: ResMut<CursorAim>,
) {
    let Ok(window) = window_query.single() else {
        return;
    };
    let Ok((camera, camera_transform)) = camera_query.single() else {
        return;
    };
    aim.0 = window
        .cursor_position()
        .and_then(|p| camera.viewport_to_world_2d(camera_transform, p).ok())
        .map(world_to_playfield);
}

/// Left click fires toward the cursor; the core validates the aim.
fn fire_on_click(
    buttons: Res<ButtonInput<MouseButton>>,
    aim: Res<CursorAim>,
    mut requests: MessageWriter<FireRequest>,
) {
    if buttons.just_pressed(MouseButton::Left)
        && let Some(aim) = aim.0
    {
        requests.write(FireRequest { aim });
    }
}

/// Walls, danger line, shooter, queue preview, and the aim line.
fn draw_playfield(
    mut gizmos: Gizmos,
    aim: Res<CursorAim>,
    queue: Res<ShooterQueue>,
    session: Res<Session>,
) {
    let wall_color = css::ORANGE.with_alpha(0.8);
    let top_left = playfield_to_world(Vec2::ZERO);
    let top_right = playfield_to_world(Vec2::new(FIELD_WIDTH, 0.0));
    let bottom_left = playfield_to_world(Vec2::new(0.0, FIELD_HEIGHT));
    let bottom_right = playfield_to_world(Vec2::new(FIELD_WIDTH, FIELD_HEIGHT));
    gizmos.line_2d(top_left, top_right, wall_color);
    gizmos.line_2d(top_left, bottom_left, wall_color);
    gizmos.line_2d(top_right, bottom_right, wall_color);

    let danger_color = if session.freeze_remaining > 0.0 {
        css::DEEP_SKY_BLUE.with_alpha(0.8)
    } else {
        css::RED.with_alpha(0.6)
    };
    gizmos.line_2d(
        playfield_to_world(Vec2::new(0.0, DANGER_LINE_Y)),
        playfield_to_world(Vec2::new(FIELD_WIDTH, DANGER_LINE_Y)),
        danger_color,
    );

    // The loaded bubble and the preview behind it.
    let shooter = playfield_to_world(shooter_position());
    gizmos.circle_2d(shooter, BUBBLE_RADIUS, queue.loaded.to_color());
    let preview = shooter + Vec2::new(BUBBLE_RADIUS * 2.5, -10.0);
    gizmos.circle_2d(preview, BUBBLE_RADIUS * 0.6, queue.next.to_color());

    if let Some(aim) = aim.0 {
        let target = playfield_to_world(aim);
        gizmos.line_2d(shooter, target, css::WHITE.with_alpha(0.3));
    }
}

/// One-line status readout in the corner.
fn update_hud(
    session: Res<Session>,
    phase: Res<State<GamePhase>>,
    mut hud: Query<&mut Text, With<Hud>>,
) {
    let Ok(mut text) = hud.single_mut() else {
        return;
    };
    let status = match phase.get() {
        GamePhase::Menu => "press Space to start".to_string(),
        GamePhase::Playing => match session.time_remaining {
            Some(t) => format!("{t:.0}s left"),
            None => String::new(),
        },
        GamePhase::Won => format!("{} stars! Space for next level", session.stars),
        GamePhase::Lost => "level lost - Space to retry".to_string(),
    };
    text.0 = format!(
        "Level {}  Score {}  Lives {}  Combo x{}  {}",
        session.level,
        session.score,
        session.lives,
        session.combo + 1,
        status,
    );
}

fn start_on_space(mut messages: MessageWriter<StartGame>) {
    messages.write(StartGame);
}

fn advance_on_space(mut messages: MessageWriter<AdvanceLevel>) {
    messages.write(AdvanceLevel);
}

fn retry_on_space(mut messages: MessageWriter<RetryLevel>) {
    messages.write(RetryLevel);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn playfield_world_roundtrip() {
        let p = Vec2::new(300.0, 750.0);
        assert_eq!(playfield_to_world(p), Vec2::new(0.0, -350.0));
        assert_eq!(world_to_playfield(playfield_to_world(p)), p);
    }

    #[test]
    fn field_corners_map_to_centered_world() {
        assert_eq!(playfield_to_world(Vec2::ZERO), Vec2::new(-300.0, 400.0));
        assert_eq!(
            playfield_to_world(Vec2::new(FIELD_WIDTH, FIELD_HEIGHT)),
            Vec2::new(300.0, -400.0)
        );
    }
}
