//! The bubble shooter game core.
//!
//! Everything here is headless: entities carry grid cells and playfield
//! positions, never transforms or meshes. The view layer derives visuals from
//! this state, and the whole module runs under `MinimalPlugins` in tests.
//!
//! - Staggered grid coordinates and descent ([`cell`])
//! - The resting-bubble grid ([`grid`])
//! - Colors, specials, and board population ([`bubble`])
//! - Flood-fill matching and floating detection ([`cluster`])
//! - Projectile flight and landing ([`projectile`])
//! - Landing resolution and scoring ([`resolve`])
//! - The shooter queue ([`shooter`])
//! - Level table and session phases ([`level`], [`session`])
//! - Serializable state dump ([`snapshot`])

pub mod bubble;
pub mod cell;
pub mod cluster;
pub mod grid;
pub mod level;
pub mod projectile;
pub mod resolve;
pub mod session;
pub mod shooter;
pub mod snapshot;

use bevy::prelude::*;

pub(crate) fn plugin(app: &mut App) {
    app.add_plugins((
        session::plugin,
        cell::plugin,
        grid::plugin,
        bubble::plugin,
        shooter::plugin,
        projectile::plugin,
        resolve::plugin,
        snapshot::plugin,
    ));
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bevy::{state::app::StatesPlugin, time::TimeUpdateStrategy};

    use super::{
        bubble::Bubble,
        cell::DescentOffset,
        grid::BubbleGrid,
        level::LevelConfig,
        projectile::Projectile,
        session::{GamePhase, STARTING_LIVES, Session, StartGame},
        shooter::FireRequest,
    };
    use super::*;

    /// A headless app with the full game core installed, ticking a fixed
    /// 16 ms per update.
    fn game_app() -> App {
        let mut app = App::new();
        app.add_plugins((MinimalPlugins, StatesPlugin));
        app.insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_millis(
            16,
        )));
        app.add_plugins(plugin);
        app
    }

    fn phase(app: &App) -> GamePhase {
        *app.world().resource::<State<GamePhase>>().get()
    }

    #[test]
    fn starts_in_the_menu() {
        let mut app = game_app();
        app.update();
        assert_eq!(phase(&app), GamePhase::Menu);
        assert!(app.world().resource::<BubbleGrid>().is_empty());
    }

    #[test]
    fn start_game_populates_the_board() {
        let mut app = game_app();
        app.update();
        app.world_mut().write_message(StartGame);
        app.update(); // phase transition
        app.update(); // OnEnter systems ran last frame; settle one more

        assert_eq!(phase(&app), GamePhase::Playing);
        let session = app.world().resource::<Session>();
        assert_eq!(session.level, 1);
        assert_eq!(session.score, 0);

        let expected = LevelConfig::get(1).initial_bubble_count() as usize;
        assert_eq!(app.world().resource::<BubbleGrid>().len(), expected);
        let bubbles = app
            .world_mut()
            .query::<&Bubble>()
            .iter(app.world())
            .count();
        assert_eq!(bubbles, expected);
    }

    #[test]
    fn firing_spawns_exactly_one_projectile() {
        let mut app = game_app();
        app.update();
        app.world_mut().write_message(StartGame);
        app.update();
        app.update();

        // Two requests in one frame: the second finds a projectile in flight.
        app.world_mut()
            .write_message(FireRequest { aim: Vec2::new(300.0, 100.0) });
        app.world_mut()
            .write_message(FireRequest { aim: Vec2::new(200.0, 100.0) });
        app.update();

        let projectiles = app
            .world_mut()
            .query::<&Projectile>()
            .iter(app.world())
            .count();
        assert_eq!(projectiles, 1);
    }

    #[test]
    fn degenerate_aim_is_a_no_op() {
        let mut app = game_app();
        app.update();
        app.world_mut().write_message(StartGame);
        app.update();
        app.update();

        // Aiming at the shooter itself.
        app.world_mut()
            .write_message(FireRequest { aim: Vec2::new(300.0, 750.0) });
        app.update();

        let projectiles = app
            .world_mut()
            .query::<&Projectile>()
            .iter(app.world())
            .count();
        assert_eq!(projectiles, 0);
    }

    #[test]
    fn fire_requests_outside_play_are_ignored() {
        let mut app = game_app();
        app.update();
        app.world_mut()
            .write_message(FireRequest { aim: Vec2::new(300.0, 100.0) });
        app.update();

        let projectiles = app
            .world_mut()
            .query::<&Projectile>()
            .iter(app.world())
            .count();
        assert_eq!(projectiles, 0);
    }

    #[test]
    fn a_fired_bubble_eventually_lands() {
        let mut app = game_app();
        app.update();
        app.world_mut().write_message(StartGame);
        app.update();
        app.update();
        let before = app.world().resource::<BubbleGrid>().len();

        app.world_mut()
            .write_message(FireRequest { aim: Vec2::new(300.0, 100.0) });
        // Straight up at 480 px/s from y=750; give it two seconds of frames.
        for _ in 0..120 {
            app.update();
        }

        let projectiles = app
            .world_mut()
            .query::<&Projectile>()
            .iter(app.world())
            .count();
        assert_eq!(projectiles, 0, "projectile should have landed");
        // Landing either grew the grid or popped a cluster into it.
        let after = app.world().resource::<BubbleGrid>().len();
        assert_ne!(after, 0);
        assert!(after >= before.saturating_sub(60));
    }

    /// Start play, then switch the session to a descending level config and
    /// park the board one descent tick short of the danger line.
    fn park_at_danger_line(app: &mut App, lives: u32) {
        app.update();
        app.world_mut().write_message(StartGame);
        app.update();
        app.update();

        {
            let mut session = app.world_mut().resource_mut::<Session>();
            // Level 10 descends half a pixel per tick.
            session.level = 10;
            session.lives = lives;
        }
        // The level-1 board is 4 rows deep (bottom edge at 160); an offset
        // of 545 puts that edge past the 700 px danger line on the next tick.
        app.world_mut().resource_mut::<DescentOffset>().y = 545.0;
    }

    #[test]
    fn breach_on_the_last_life_loses_the_level() {
        let mut app = game_app();
        park_at_danger_line(&mut app, 1);

        // 10 frames cover several 50 ms descent ticks.
        for _ in 0..10 {
            app.update();
        }

        assert_eq!(phase(&app), GamePhase::Lost);
        assert_eq!(app.world().resource::<Session>().lives, 0);
    }

    #[test]
    fn breach_with_spare_lives_pushes_the_grid_back() {
        let mut app = game_app();
        park_at_danger_line(&mut app, STARTING_LIVES);

        // Exactly one descent tick fires in 4 frames (64 ms).
        for _ in 0..4 {
            app.update();
        }

        assert_eq!(phase(&app), GamePhase::Playing);
        assert_eq!(app.world().resource::<Session>().lives, STARTING_LIVES - 1);
        // One row height of relief, not a reset.
        assert_eq!(app.world().resource::<DescentOffset>().y, 505.0);
    }

    #[test]
    fn freeze_suspends_descent_until_it_expires() {
        let mut app = game_app();
        app.update();
        app.world_mut().write_message(StartGame);
        app.update();
        app.update();

        {
            let mut session = app.world_mut().resource_mut::<Session>();
            session.level = 10;
            session.freeze_remaining = 60.0;
        }
        for _ in 0..12 {
            app.update();
        }

        let session = app.world().resource::<Session>();
        assert!(session.freeze_remaining < 60.0, "freeze should count down");
        assert_eq!(app.world().resource::<DescentOffset>().y, 0.0);

        app.world_mut().resource_mut::<Session>().freeze_remaining = 0.0;
        for _ in 0..12 {
            app.update();
        }
        assert!(app.world().resource::<DescentOffset>().y > 0.0);
    }

    #[test]
    fn time_limit_expiry_loses_the_level() {
        let mut app = game_app();
        app.update();
        app.world_mut().write_message(StartGame);
        app.update();
        app.update();

        app.world_mut().resource_mut::<Session>().time_remaining = Some(1.0);
        // 70 frames at 16 ms pass the one-second mark.
        for _ in 0..70 {
            app.update();
        }

        assert_eq!(phase(&app), GamePhase::Lost);
        assert_eq!(
            app.world().resource::<Session>().time_remaining,
            Some(0.0)
        );
    }

    #[test]
    fn leaving_play_clears_the_board() {
        let mut app = game_app();
        app.update();
        app.world_mut().write_message(StartGame);
        app.update();
        app.update();
        assert!(!app.world().resource::<BubbleGrid>().is_empty());

        app.world_mut()
            .resource_mut::<NextState<GamePhase>>()
            .set(GamePhase::Lost);
        app.update();
        app.update();

        assert!(app.world().resource::<BubbleGrid>().is_empty());
        let bubbles = app
            .world_mut()
            .query::<&Bubble>()
            .iter(app.world())
            .count();
        assert_eq!(bubbles, 0);
    }
}
