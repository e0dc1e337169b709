//! Bubble colors and the procedural level population.
//!
//! Eight playable hues plus the special kinds: rainbow, bomb, freeze, and the
//! inert gray obstacle. Three or more connected bubbles of one hue pop.

use bevy::prelude::*;
use rand::Rng;
use serde::Serialize;

use super::{
    cell::GridCell,
    grid::BubbleGrid,
    level::LevelConfig,
    session::{GamePhase, Session},
};

pub(super) fn plugin(app: &mut App) {
    app.register_type::<Bubble>();
    app.register_type::<BubbleColor>();

    app.add_systems(
        OnEnter(GamePhase::Playing),
        spawn_level_bubbles.after(super::session::enter_level),
    );
    app.add_systems(OnExit(GamePhase::Playing), clear_grid);
}

/// Chance for a cell to hold a gray obstacle on obstacle-enabled levels.
const OBSTACLE_CHANCE: f64 = 0.05;

/// Chance for a cell to hold a special bubble on power-up-enabled levels.
const POWER_UP_CHANCE: f64 = 0.03;

/// Every bubble color, playable hues first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Component, Reflect, Serialize, Default)]
#[reflect(Component)]
pub enum BubbleColor {
    #[default]
    Red,
    Blue,
    Green,
    Yellow,
    Purple,
    Orange,
    Cyan,
    Pink,
    /// Adopts a concrete hue when it lands.
    Rainbow,
    /// Clears itself and all neighbors on landing.
    Bomb,
    /// Suspends descent for a few seconds; never joins the grid.
    Freeze,
    /// Inert obstacle: never matches, only a bomb or detachment removes it.
    Gray,
}

/// The playable hues in palette order; levels use a prefix of this list.
pub const PALETTE: [BubbleColor; 8] = [
    BubbleColor::Red,
    BubbleColor::Blue,
    BubbleColor::Green,
    BubbleColor::Yellow,
    BubbleColor::Purple,
    BubbleColor::Orange,
    BubbleColor::Cyan,
    BubbleColor::Pink,
];

/// Special kinds a power-up roll can produce.
const SPECIALS: [BubbleColor; 3] = [BubbleColor::Rainbow, BubbleColor::Bomb, BubbleColor::Freeze];

impl BubbleColor {
    /// The active palette for a given level config.
    pub fn palette(config: &LevelConfig) -> &'static [BubbleColor] {
        &PALETTE[..config.colors.min(PALETTE.len())]
    }

    /// Uniformly random pick from a non-empty slice of colors.
    pub fn random_from(colors: &[BubbleColor]) -> BubbleColor {
        let mut rng = rand::rng();
        colors[rng.random_range(0..colors.len())]
    }

    /// Uniformly random special kind.
    pub fn random_special() -> BubbleColor {
        Self::random_from(&SPECIALS)
    }

    /// Gray obstacles never match and never propagate a traversal.
    pub fn is_obstacle(self) -> bool {
        self == BubbleColor::Gray
    }

    /// Rainbow, bomb, or freeze.
    pub fn is_special(self) -> bool {
        SPECIALS.contains(&self)
    }

    /// Whether two resting bubbles form part of one same-color group.
    pub fn matches(self, other: BubbleColor) -> bool {
        self == other && !self.is_obstacle()
    }

    /// Display color for the view layer.
    pub fn to_color(self) -> Color {
        match self {
            BubbleColor::Red => Color::srgb_u8(255, 59, 59),
            BubbleColor::Blue => Color::srgb_u8(59, 130, 255),
            BubbleColor::Green => Color::srgb_u8(59, 255, 130),
            BubbleColor::Yellow => Color::srgb_u8(255, 217, 59),
            BubbleColor::Purple => Color::srgb_u8(182, 59, 255),
            BubbleColor::Orange => Color::srgb_u8(255, 130, 59),
            BubbleColor::Cyan => Color::srgb_u8(59, 255, 255),
            BubbleColor::Pink => Color::srgb_u8(255, 59, 255),
            BubbleColor::Rainbow => Color::srgb_u8(240, 240, 240),
            BubbleColor::Bomb => Color::srgb_u8(26, 26, 26),
            BubbleColor::Freeze => Color::srgb_u8(168, 230, 255),
            BubbleColor::Gray => Color::srgb_u8(128, 128, 128),
        }
    }
}

/// A bubble at rest on the grid. Its cell is the [`GridCell`] component
/// alongside it.
#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
pub struct Bubble {
    pub color: BubbleColor,
}

/// Roll one cell of the initial board.
fn roll_initial_color(config: &LevelConfig) -> BubbleColor {
    let mut rng = rand::rng();
    if config.has_obstacles && rng.random_bool(OBSTACLE_CHANCE) {
        BubbleColor::Gray
    } else if config.has_power_ups && rng.random_bool(POWER_UP_CHANCE) {
        BubbleColor::random_special()
    } else {
        BubbleColor::random_from(BubbleColor::palette(config))
    }
}

/// Spawn a single resting bubble and record it in the grid.
pub fn spawn_bubble(
    commands: &mut Commands,
    grid: &mut BubbleGrid,
    cell: GridCell,
    color: BubbleColor,
) -> Entity {
    let entity = commands
        .spawn((
            Name::new(format!("Bubble {:?} at {}", color, cell)),
            Bubble { color },
            cell,
            DespawnOnExit(GamePhase::Playing),
        ))
        .id();
    grid.insert(cell, entity, color);
    entity
}

/// Populate the board when a level starts.
///
/// A config that cannot produce a playable board is a validation failure, not
/// an instant win: it is logged and the session bounces back to the menu.
fn spawn_level_bubbles(
    mut commands: Commands,
    mut grid: ResMut<BubbleGrid>,
    session: Res<Session>,
    mut next_phase: ResMut<NextState<GamePhase>>,
) {
    let config = LevelConfig::get(session.level);
    if let Err(err) = config.validate() {
        error!("Level {} config rejected: {err}", session.level);
        next_phase.set(GamePhase::Menu);
        return;
    }

    grid.clear();
    let mut count = 0;
    for row in 0..config.rows {
        for col in 0..GridCell::columns_in_row(row) {
            let cell = GridCell::new(row, col);
            spawn_bubble(&mut commands, &mut grid, cell, roll_initial_color(config));
            count += 1;
        }
    }

    info!(
        "Level {}: spawned {count} bubbles ({} colors, speed {}, obstacles: {}, power-ups: {}, moving rows: {})",
        session.level,
        config.colors,
        config.speed,
        config.has_obstacles,
        config.has_power_ups,
        config.moving_rows,
    );
}

/// Drop the grid's cell index when leaving play; the entities despawn on exit.
fn clear_grid(mut grid: ResMut<BubbleGrid>) {
    grid.clear();
    info!("Cleared bubble grid");
}

#[cfg(test)]
mod tests {
    use super::super::level::LevelConfig;
    use super::*;

    #[test]
    fn palette_is_a_prefix_of_the_hue_list() {
        let config = LevelConfig::get(1);
        let palette = BubbleColor::palette(config);
        assert_eq!(palette, &PALETTE[..3]);
        assert!(palette.iter().all(|c| !c.is_special() && !c.is_obstacle()));
    }

    #[test]
    fn gray_matches_nothing_including_itself() {
        assert!(!BubbleColor::Gray.matches(BubbleColor::Gray));
        assert!(!BubbleColor::Gray.matches(BubbleColor::Red));
        assert!(BubbleColor::Red.matches(BubbleColor::Red));
        assert!(!BubbleColor::Red.matches(BubbleColor::Blue));
    }

    #[test]
    fn initial_rolls_respect_the_level_flags() {
        // Level 1: no obstacles, no power-ups.
        let config = LevelConfig::get(1);
        for _ in 0..200 {
            let color = roll_initial_color(config);
            assert!(!color.is_obstacle());
            assert!(!color.is_special());
        }
    }
}
