//! The shooter at the bottom of the playfield.
//!
//! Holds a loaded bubble and a preview of the next one. A fire request turns
//! into a projectile only after validation: one projectile in flight at a
//! time, and the aim must point upward.

use bevy::prelude::*;
use rand::Rng;

use super::{
    bubble::BubbleColor,
    cell::FIELD_WIDTH,
    level::LevelConfig,
    projectile::{FireProjectile, Projectile},
    session::{GamePhase, Session},
};

pub(super) fn plugin(app: &mut App) {
    app.init_resource::<ShooterQueue>();
    app.register_type::<ShooterQueue>();
    app.add_message::<FireRequest>();

    app.add_systems(OnEnter(GamePhase::Playing), reload_queue);
    app.add_systems(
        Update,
        handle_fire
            .before(super::projectile::ProjectileSystems)
            .run_if(in_state(GamePhase::Playing)),
    );
}

/// Horizontal center of the shooter.
pub const SHOOTER_X: f32 = FIELD_WIDTH / 2.0;

/// Vertical position of the shooter in playfield pixels.
pub const SHOOTER_Y: f32 = 750.0;

/// Flattest allowed launch: the direction must keep at least this much
/// upward component.
const MIN_UPWARD: f32 = 0.1;

/// Chance the queue rolls a special bubble on power-up levels.
const SPECIAL_SHOT_CHANCE: f64 = 0.03;

/// Message: the player asked to fire toward `aim` (playfield pixels).
#[derive(Message, Debug, Clone)]
pub struct FireRequest {
    pub aim: Vec2,
}

/// The loaded bubble and the preview behind it.
#[derive(Resource, Debug, Default, Reflect)]
#[reflect(Resource)]
pub struct ShooterQueue {
    pub loaded: BubbleColor,
    pub next: BubbleColor,
}

impl ShooterQueue {
    /// Shift the preview into the chamber and roll a replacement.
    fn advance(&mut self, config: &LevelConfig) {
        self.loaded = self.next;
        self.next = roll_shot(config);
    }
}

/// Roll a color for the queue. Power-up levels occasionally hand the player
/// a special bubble to fire.
fn roll_shot(config: &LevelConfig) -> BubbleColor {
    let mut rng = rand::rng();
    if config.has_power_ups && rng.random_bool(SPECIAL_SHOT_CHANCE) {
        BubbleColor::random_special()
    } else {
        BubbleColor::random_from(BubbleColor::palette(config))
    }
}

/// Roll a fresh queue when a level starts.
fn reload_queue(mut queue: ResMut<ShooterQueue>, session: Res<Session>) {
    let config = LevelConfig::get(session.level);
    queue.loaded = roll_shot(config);
    queue.next = roll_shot(config);
    info!(
        "Shooter loaded with {:?}, next up {:?}",
        queue.loaded, queue.next
    );
}

/// Position the projectile launches from.
pub fn shooter_position() -> Vec2 {
    Vec2::new(SHOOTER_X, SHOOTER_Y)
}

/// Normalize and validate an aim point into a launch direction.
///
/// Returns `None` for a degenerate aim (at the shooter itself or pointing
/// down with no way to clamp). A nearly horizontal aim is tilted up to the
/// minimum launch angle, matching what the player sees the aim line do.
pub(super) fn launch_direction(aim: Vec2) -> Option<Vec2> {
    let raw = aim - shooter_position();
    if raw.length_squared() < f32::EPSILON {
        return None;
    }

    let mut direction = raw.normalize();
    // Playfield y grows downward, so "up" is negative y.
    if direction.y > -MIN_UPWARD {
        if direction.x == 0.0 {
            return None;
        }
        direction.y = -MIN_UPWARD;
        direction = direction.normalize();
    }
    Some(direction)
}

/// Validate a fire request and launch the loaded bubble.
fn handle_fire(
    mut requests: MessageReader<FireRequest>,
    in_flight: Query<(), With<Projectile>>,
    mut queue: ResMut<ShooterQueue>,
    session: Res<Session>,
    mut fire_events: MessageWriter<FireProjectile>,
) {
    // Covers both a projectile already in flight and one fired earlier this
    // frame whose spawn command has not applied yet.
    let mut busy = !in_flight.is_empty();
    for request in requests.read() {
        if busy {
            // One shot at a time; extra requests are dropped, not queued.
            continue;
        }

        let Some(direction) = launch_direction(request.aim) else {
            warn!("Rejected fire request with degenerate aim {:?}", request.aim);
            continue;
        };

        fire_events.write(FireProjectile {
            position: shooter_position(),
            direction,
            color: queue.loaded,
        });
        queue.advance(LevelConfig::get(session.level));
        busy = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aim_at_the_shooter_is_rejected() {
        assert_eq!(launch_direction(shooter_position()), None);
    }

    #[test]
    fn straight_up_passes_through() {
        let direction = launch_direction(Vec2::new(SHOOTER_X, 100.0));
        assert_eq!(direction, Some(Vec2::new(0.0, -1.0)));
    }

    #[test]
    fn downward_aim_is_clamped_to_the_minimum_angle() {
        let direction = launch_direction(Vec2::new(SHOOTER_X + 100.0, SHOOTER_Y + 50.0));
        let direction = direction.unwrap();
        // Still upward, still normalized, still pointing right.
        assert!(direction.y < 0.0);
        assert!(direction.x > 0.0);
        assert!((direction.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn straight_down_has_no_valid_clamp() {
        assert_eq!(launch_direction(Vec2::new(SHOOTER_X, SHOOTER_Y + 100.0)), None);
    }

    #[test]
    fn queue_advance_promotes_the_preview() {
        let mut queue = ShooterQueue {
            loaded: BubbleColor::Red,
            next: BubbleColor::Blue,
        };
        queue.advance(LevelConfig::get(1));
        assert_eq!(queue.loaded, BubbleColor::Blue);
    }

    #[test]
    fn early_levels_never_roll_specials() {
        let config = LevelConfig::get(1);
        for _ in 0..200 {
            let color = roll_shot(config);
            assert!(!color.is_special());
            assert!(!color.is_obstacle());
        }
    }
}
