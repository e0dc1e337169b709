//! Projectile - the bubble being shot.
//!
//! The projectile travels in a straight line, bouncing off walls, until it
//! reaches the ceiling or comes within one diameter of a resting bubble. At
//! that instant it snaps to the nearest free cell and becomes a resting
//! bubble; the resolution pipeline takes it from there.
//!
//! Positions are playfield pixels (y-down); the view derives transforms.

use bevy::prelude::*;

use super::{
    bubble::{BubbleColor, spawn_bubble},
    cell::{BUBBLE_DIAMETER, BUBBLE_RADIUS, DescentOffset, FIELD_HEIGHT, FIELD_WIDTH, GridCell},
    grid::BubbleGrid,
    session::GamePhase,
};

pub(super) fn plugin(app: &mut App) {
    app.register_type::<Projectile>();
    app.add_message::<FireProjectile>();
    app.add_message::<BubbleLanded>();

    app.add_systems(
        Update,
        (spawn_projectile, move_projectile, bounce_walls, check_landing)
            .chain()
            .in_set(ProjectileSystems)
            .run_if(in_state(GamePhase::Playing)),
    );
}

/// System set for projectile systems; resolution runs after it.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectileSystems;

/// Speed of the projectile in pixels per second (8 px per 60 Hz frame).
const PROJECTILE_SPEED: f32 = 480.0;

/// Left wall of the playfield.
pub const LEFT_WALL: f32 = 0.0;

/// Right wall of the playfield.
pub const RIGHT_WALL: f32 = FIELD_WIDTH;

/// The ceiling; a projectile whose top edge crosses it lands there.
pub const CEILING_Y: f32 = 0.0;

/// Message to launch a projectile; written by the shooter after validation.
#[derive(Message, Debug, Clone)]
pub struct FireProjectile {
    pub position: Vec2,
    /// Normalized launch direction.
    pub direction: Vec2,
    pub color: BubbleColor,
}

/// Message sent when a projectile lands and becomes a resting bubble.
#[derive(Message, Debug, Clone)]
pub struct BubbleLanded {
    /// Cell the projectile snapped to.
    pub cell: GridCell,
    /// Color it was fired with (rainbow still unresolved here).
    pub color: BubbleColor,
    /// Color of the bubble it touched, if it landed by contact rather than
    /// at the ceiling. Rainbow adopts this.
    pub struck: Option<BubbleColor>,
    /// The freshly spawned resting bubble.
    pub entity: Entity,
}

/// The single in-flight bubble. At most one exists at a time.
#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
pub struct Projectile {
    /// Center position in playfield pixels.
    pub pos: Vec2,
    /// Velocity in pixels per second.
    pub velocity: Vec2,
    pub color: BubbleColor,
}

/// Spawn a projectile when the fire message arrives.
fn spawn_projectile(mut commands: Commands, mut fire_events: MessageReader<FireProjectile>) {
    for event in fire_events.read() {
        let velocity = event.direction * PROJECTILE_SPEED;
        commands.spawn((
            Name::new("Projectile"),
            Projectile {
                pos: event.position,
                velocity,
                color: event.color,
            },
            DespawnOnExit(GamePhase::Playing),
        ));
        info!(
            "Fired {:?} projectile from {:?} with velocity {:?}",
            event.color, event.position, velocity
        );
    }
}

/// Displacement for one frame, capped at one radius so a long frame cannot
/// carry the projectile past the contact test, which only looks at the
/// endpoint.
pub(super) fn flight_step(velocity: Vec2, delta_secs: f32) -> Vec2 {
    (velocity * delta_secs).clamp_length_max(BUBBLE_RADIUS)
}

/// Advance the projectile by its velocity.
fn move_projectile(time: Res<Time>, mut query: Query<&mut Projectile>) {
    for mut projectile in &mut query {
        let step = flight_step(projectile.velocity, time.delta_secs());
        projectile.pos += step;
    }
}

/// Reflect the horizontal velocity off the side walls, clamping the position
/// back inside the field. Magnitude is preserved; only the sign flips.
pub(super) fn wall_reflect(pos: &mut Vec2, velocity: &mut Vec2) {
    if pos.x - BUBBLE_RADIUS < LEFT_WALL {
        pos.x = LEFT_WALL + BUBBLE_RADIUS;
        velocity.x = velocity.x.abs();
    }
    if pos.x + BUBBLE_RADIUS > RIGHT_WALL {
        pos.x = RIGHT_WALL - BUBBLE_RADIUS;
        velocity.x = -velocity.x.abs();
    }
}

/// Bounce the projectile off the side walls.
fn bounce_walls(mut query: Query<&mut Projectile>) {
    for mut projectile in &mut query {
        let Projectile {
            mut pos,
            mut velocity,
            ..
        } = *projectile;
        wall_reflect(&mut pos, &mut velocity);
        projectile.pos = pos;
        projectile.velocity = velocity;
    }
}

/// The resting bubble nearest to `pos` within one diameter, if any.
///
/// Scanning the whole grid keeps this deterministic: the closest contact wins
/// rather than whichever cell the map happens to yield first.
pub(super) fn find_contact(
    grid: &BubbleGrid,
    descent_y: f32,
    pos: Vec2,
) -> Option<(GridCell, BubbleColor)> {
    grid.iter()
        .filter_map(|(cell, slot)| {
            let distance = cell.to_pixel_with_offset(descent_y).distance(pos);
            (distance < BUBBLE_DIAMETER).then_some((cell, slot.color, distance))
        })
        .min_by(|a, b| a.2.total_cmp(&b.2))
        .map(|(cell, color, _)| (cell, color))
}

/// Detect ceiling or bubble contact and convert the projectile into a
/// resting bubble on the nearest free cell.
fn check_landing(
    mut commands: Commands,
    mut grid: ResMut<BubbleGrid>,
    offset: Res<DescentOffset>,
    query: Query<(Entity, &Projectile)>,
    mut landed_events: MessageWriter<BubbleLanded>,
) {
    for (entity, projectile) in &query {
        let pos = projectile.pos;

        // Ceiling first, then bubble contact; at most one landing per tick.
        let contact = if pos.y - BUBBLE_RADIUS <= CEILING_Y {
            Some((Vec2::new(pos.x, BUBBLE_RADIUS), None))
        } else {
            find_contact(&grid, offset.y, pos).map(|(_, color)| (pos, Some(color)))
        };

        if let Some((snap_from, struck)) = contact {
            let Some(cell) = grid.closest_empty_cell(snap_from, offset.y) else {
                warn!("No free cell to land on near {:?}, discarding projectile", snap_from);
                commands.entity(entity).despawn();
                continue;
            };

            commands.entity(entity).despawn();
            let new_entity = spawn_bubble(&mut commands, &mut grid, cell, projectile.color);
            info!("Bubble landed at {} with color {:?}", cell, projectile.color);
            landed_events.write(BubbleLanded {
                cell,
                color: projectile.color,
                struck,
                entity: new_entity,
            });
            continue;
        }

        // A projectile that somehow leaves the bottom of the field is lost.
        if pos.y > FIELD_HEIGHT + BUBBLE_DIAMETER {
            warn!("Projectile left the field at {:?}, despawning", pos);
            commands.entity(entity).despawn();
        }
    }
}
