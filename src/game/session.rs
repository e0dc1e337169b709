//! Session state - score, lives, combo, timers, and the phase machine.
//!
//! Phases: menu -> playing -> {won, lost}; won advances to the next level,
//! lost retries the same one, both through re-initialization. All per-frame
//! timers here run only while playing, so a phase change structurally cancels
//! them - a stale tick can never mutate a finished level.

use bevy::prelude::*;
use serde::Serialize;

use super::{
    cell::{BUBBLE_DIAMETER, DescentOffset},
    grid::BubbleGrid,
    level::{LAST_LEVEL, LevelConfig},
    shooter::SHOOTER_Y,
};

pub(super) fn plugin(app: &mut App) {
    app.init_state::<GamePhase>();
    app.init_resource::<Session>();
    app.register_type::<Session>();
    app.init_resource::<DescentTimer>();
    app.init_resource::<TimeLimitTimer>();

    app.add_message::<StartGame>();
    app.add_message::<AdvanceLevel>();
    app.add_message::<RetryLevel>();

    app.add_systems(OnEnter(GamePhase::Playing), enter_level);
    app.add_systems(
        Update,
        (
            // Identity transitions do not re-enter a state, so a restart
            // mid-level is not accepted.
            handle_start_game.run_if(not(in_state(GamePhase::Playing))),
            handle_advance_level.run_if(in_state(GamePhase::Won)),
            handle_retry_level.run_if(in_state(GamePhase::Lost)),
        ),
    );
    app.add_systems(
        Update,
        (tick_freeze, descend_grid, tick_time_limit)
            .chain()
            .run_if(in_state(GamePhase::Playing)),
    );
}

/// Lives granted at the start of every level.
pub const STARTING_LIVES: u32 = 3;

/// How long a freeze bubble suspends descent, in seconds.
pub const FREEZE_DURATION: f32 = 5.0;

/// Cadence of the descent timer, in seconds (the level speed is per tick).
const DESCENT_TICK: f32 = 0.05;

/// Points per bubble removed, before the combo multiplier.
const POINTS_PER_BUBBLE: u32 = 10;

/// Flat bonus per star on level completion.
const STAR_BONUS: u32 = 1000;

/// Bubbles whose bottom edge crosses this line cost a life.
pub const DANGER_LINE_Y: f32 = SHOOTER_Y - 50.0;

/// The session's phase machine.
#[derive(States, Copy, Clone, Eq, PartialEq, Hash, Debug, Default, Serialize)]
pub enum GamePhase {
    #[default]
    Menu,
    Playing,
    Won,
    Lost,
}

/// Message: start a fresh game from level 1 (score resets).
#[derive(Message, Debug, Clone)]
pub struct StartGame;

/// Message: advance from a won level to the next one.
#[derive(Message, Debug, Clone)]
pub struct AdvanceLevel;

/// Message: retry the level that was just lost.
#[derive(Message, Debug, Clone)]
pub struct RetryLevel;

/// Resource holding all cross-system session state.
#[derive(Resource, Debug, Reflect)]
#[reflect(Resource)]
pub struct Session {
    /// Current level, 1-based.
    pub level: u32,
    /// Cumulative score; never decreases within a level.
    pub score: u32,
    /// Lives left this level; a bottom breach costs one.
    pub lives: u32,
    /// Consecutive clearing shots; a non-clearing shot resets it.
    pub combo: u32,
    /// Stars earned on the last completed level.
    pub stars: u32,
    /// Seconds of freeze left; descent is suspended while positive.
    pub freeze_remaining: f32,
    /// Seconds left on a timed level.
    pub time_remaining: Option<f32>,
    /// Nominal bubble total of this level, for star scoring.
    pub initial_total: u32,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            level: 1,
            score: 0,
            lives: STARTING_LIVES,
            combo: 0,
            stars: 0,
            freeze_remaining: 0.0,
            time_remaining: None,
            initial_total: 0,
        }
    }
}

impl Session {
    /// Reset the per-level state; score and level number carry across.
    pub fn reset_for_level(&mut self, config: &LevelConfig) {
        self.lives = STARTING_LIVES;
        self.combo = 0;
        self.stars = 0;
        self.freeze_remaining = 0.0;
        self.time_remaining = config.time_limit;
        self.initial_total = config.nominal_total();
    }

    /// Score a clearing shot: `(popped + floating) * 10 * (combo + 1)`,
    /// then extend the combo. Returns the points awarded.
    pub fn apply_clear(&mut self, popped: usize, floating: usize) -> u32 {
        let points = (popped + floating) as u32 * POINTS_PER_BUBBLE * (self.combo + 1);
        self.score += points;
        self.combo += 1;
        points
    }

    /// A shot that cleared nothing breaks the streak.
    pub fn apply_miss(&mut self) {
        self.combo = 0;
    }

    /// Award the end-of-level star bonus, given how many clearable bubbles
    /// are still on the board. Returns the bonus points.
    ///
    /// The fraction is measured against the board itself, so a win (zero
    /// clearable bubbles left) is always a full clear regardless of how many
    /// shots it took or how many grays remain.
    pub fn apply_win(&mut self, remaining: u32) -> u32 {
        let cleared = self.initial_total.saturating_sub(remaining);
        self.stars = stars_for(cleared, self.initial_total);
        let bonus = STAR_BONUS * self.stars;
        self.score += bonus;
        bonus
    }

    /// A bubble reached the bottom; lose a life. Returns true when the level
    /// is lost.
    pub fn register_breach(&mut self) -> bool {
        self.lives = self.lives.saturating_sub(1);
        self.lives == 0
    }
}

/// Stars for clearing `cleared` of `total` bubbles: all of them is 3 stars,
/// at least 80% is 2, at least half is 1.
pub fn stars_for(cleared: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let fraction = cleared as f32 / total as f32;
    if fraction >= 1.0 {
        3
    } else if fraction >= 0.8 {
        2
    } else if fraction >= 0.5 {
        1
    } else {
        0
    }
}

/// Repeating timer driving grid descent.
#[derive(Resource)]
pub struct DescentTimer(Timer);

impl Default for DescentTimer {
    fn default() -> Self {
        Self(Timer::from_seconds(DESCENT_TICK, TimerMode::Repeating))
    }
}

/// Repeating one-second timer for levels with a time limit.
#[derive(Resource)]
pub struct TimeLimitTimer(Timer);

impl Default for TimeLimitTimer {
    fn default() -> Self {
        Self(Timer::from_seconds(1.0, TimerMode::Repeating))
    }
}

/// Reset per-level session state when entering play.
///
/// Board population runs right after this; see `bubble::spawn_level_bubbles`.
pub(super) fn enter_level(
    mut session: ResMut<Session>,
    mut descent_timer: ResMut<DescentTimer>,
    mut limit_timer: ResMut<TimeLimitTimer>,
) {
    let config = LevelConfig::get(session.level);
    session.reset_for_level(config);
    descent_timer.0.reset();
    limit_timer.0.reset();
    info!(
        "Level {} started: {} lives, time limit {:?}",
        session.level, session.lives, session.time_remaining
    );
}

/// Start a fresh game from the first level.
fn handle_start_game(
    mut events: MessageReader<StartGame>,
    mut session: ResMut<Session>,
    mut next_phase: ResMut<NextState<GamePhase>>,
) {
    for _ in events.read() {
        session.score = 0;
        session.level = 1;
        next_phase.set(GamePhase::Playing);
        info!("New game started");
    }
}

/// Move on from a won level; past the last level there is nowhere to go.
fn handle_advance_level(
    mut events: MessageReader<AdvanceLevel>,
    mut session: ResMut<Session>,
    mut next_phase: ResMut<NextState<GamePhase>>,
) {
    for _ in events.read() {
        if session.level < LAST_LEVEL {
            session.level += 1;
            next_phase.set(GamePhase::Playing);
            info!("Advancing to level {}", session.level);
        } else {
            info!("All {LAST_LEVEL} levels cleared");
        }
    }
}

/// Re-initialize the level that was just lost.
fn handle_retry_level(
    mut events: MessageReader<RetryLevel>,
    session: Res<Session>,
    mut next_phase: ResMut<NextState<GamePhase>>,
) {
    for _ in events.read() {
        next_phase.set(GamePhase::Playing);
        info!("Retrying level {}", session.level);
    }
}

/// Count down an active freeze; descent resumes when it runs out.
fn tick_freeze(time: Res<Time>, mut session: ResMut<Session>) {
    if session.freeze_remaining > 0.0 {
        session.freeze_remaining = (session.freeze_remaining - time.delta_secs()).max(0.0);
        if session.freeze_remaining == 0.0 {
            info!("Freeze expired, descent resumes");
        }
    }
}

/// Advance the grid downward on the descent cadence.
///
/// A step that would push the lowest bubble past the danger line is not
/// applied: it costs a life instead and the grid relaxes back up one row. At
/// zero lives the level ends immediately and no further grid mutation
/// happens this tick.
fn descend_grid(
    time: Res<Time>,
    mut timer: ResMut<DescentTimer>,
    mut offset: ResMut<DescentOffset>,
    mut session: ResMut<Session>,
    grid: Res<BubbleGrid>,
    mut next_phase: ResMut<NextState<GamePhase>>,
) {
    let config = LevelConfig::get(session.level);
    if config.speed <= 0.0 || session.freeze_remaining > 0.0 {
        return;
    }

    timer.0.tick(time.delta());
    for _ in 0..timer.0.times_finished_this_tick() {
        let advanced = offset.y + config.speed;
        let breached = grid
            .lowest_bottom_edge(advanced)
            .is_some_and(|bottom| bottom >= DANGER_LINE_Y);

        if !breached {
            offset.y = advanced;
            continue;
        }

        if session.register_breach() {
            warn!("Out of lives at level {}", session.level);
            next_phase.set(GamePhase::Lost);
            return;
        }
        // Relax the grid one row upward so the breach is edge-triggered.
        offset.y = (offset.y - BUBBLE_DIAMETER).max(0.0);
        info!("Bubbles reached the bottom, {} lives left", session.lives);
    }
}

/// Count down the level's time limit, one second at a time.
fn tick_time_limit(
    time: Res<Time>,
    mut timer: ResMut<TimeLimitTimer>,
    mut session: ResMut<Session>,
    mut next_phase: ResMut<NextState<GamePhase>>,
) {
    let Some(remaining) = session.time_remaining else {
        return;
    };

    timer.0.tick(time.delta());
    let elapsed = timer.0.times_finished_this_tick() as f32;
    if elapsed == 0.0 {
        return;
    }

    let left = (remaining - elapsed).max(0.0);
    session.time_remaining = Some(left);
    if left == 0.0 {
        warn!("Time ran out on level {}", session.level);
        next_phase.set(GamePhase::Lost);
    }
}
