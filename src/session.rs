//! Stage lifecycle: start, score and lives bookkeeping, death, game over and
//! stage clear. Runs after the player has been stepped each frame.

use crate::{
    collision,
    input::InputEvent,
    player::Player,
    stage::{Stage, StageProvider},
};
use anyhow::Result;
use serde::{Deserialize, Serialize};

const STARTING_LIVES: u32 = 3;
/// How far below the ground line the player's top may drop before it counts as a fall.
const FALL_DEATH_DEPTH: f32 = 200.0;
/// Game time between losing the last life to a spike and the game over screen.
const GAME_OVER_DELAY: f32 = 1.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    NotStarted,
    Running,
    Completing,
    GameOver,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    Start,
    ReachGoal,
    RunOutOfLives,
}

impl Phase {
    /// Events that make no sense in the current phase leave it unchanged.
    pub fn transition(self, event: SessionEvent) -> Phase {
        match (self, event) {
            (_, SessionEvent::Start) => Phase::Running,
            (Phase::Running, SessionEvent::ReachGoal) => Phase::Completing,
            (Phase::Running, SessionEvent::RunOutOfLives) => Phase::GameOver,
            (phase, _) => phase,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct GameState {
    pub score: u32,
    pub items_collected: u32,
    pub elapsed: f32,
    pub lives: u32,
}

impl Default for GameState {
    fn default() -> Self {
        GameState {
            score: 0,
            items_collected: 0,
            elapsed: 0.0,
            lives: STARTING_LIVES,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StageStats {
    pub score: u32,
    pub time: f32,
    pub items_collected: u32,
}

impl From<&GameState> for StageStats {
    fn from(state: &GameState) -> Self {
        StageStats {
            score: state.score,
            time: state.elapsed,
            items_collected: state.items_collected,
        }
    }
}

/// Where finished stages are recorded. Called once per clear.
pub trait ProgressSink {
    fn save_stage_completion(&mut self, stage_number: u32, stats: &StageStats) -> Result<()>;
}

pub trait GameUi {
    fn show_stage_start(&mut self, _stage_number: u32) -> Result<()> {
        Ok(())
    }
    fn update_game_ui(&mut self, state: &GameState) -> Result<()>;
    fn show_game_clear(&mut self, stage_number: u32, stats: &StageStats) -> Result<()>;
    fn show_game_over(&mut self, state: &GameState) -> Result<()>;
}

struct Level {
    stage: Stage,
    player: Player,
}

pub struct Session {
    phase: Phase,
    level: Option<Level>,
    state: GameState,
    canvas_height: f32,
    game_over_countdown: Option<f32>,
    stages: Box<dyn StageProvider>,
    progress: Box<dyn ProgressSink>,
    ui: Box<dyn GameUi>,
}

impl Session {
    pub fn new(
        canvas_height: f32,
        stages: Box<dyn StageProvider>,
        progress: Box<dyn ProgressSink>,
        ui: Box<dyn GameUi>,
    ) -> Self {
        Session {
            phase: Phase::NotStarted,
            level: None,
            state: GameState::default(),
            canvas_height,
            game_over_countdown: None,
            stages,
            progress,
            ui,
        }
    }

    pub fn start_stage(&mut self, number: u32) -> Result<()> {
        let stage = self.stages.stage(number, self.canvas_height);
        let player = Player::new(stage.spawn);
        log!("Starting stage {}", stage.number);

        self.ui.show_stage_start(stage.number)?;
        self.level = Some(Level { stage, player });
        self.state = GameState::default();
        self.game_over_countdown = None;
        self.phase = self.phase.transition(SessionEvent::Start);
        Ok(())
    }

    /// What to offer once the stage has ended: the following stage after a
    /// clear, the same one again after a game over.
    pub fn next_stage(&self) -> Option<u32> {
        let number = self.stage()?.number;
        match self.phase {
            Phase::Completing => Some(number + 1),
            Phase::GameOver => Some(number),
            Phase::NotStarted | Phase::Running => None,
        }
    }

    pub fn update(&mut self, input: &[InputEvent], dt: f32) -> Result<()> {
        if self.phase != Phase::Running {
            return Ok(());
        }

        if let Some(level) = self.level.as_mut() {
            for event in input {
                level.player.handle_input(*event);
            }
            level.player.update(dt, Some(&level.stage));
        }
        self.state.elapsed += dt;

        self.check_items();
        self.check_obstacles();
        self.check_fall()?;
        self.check_goal()?;
        self.count_down_game_over(dt)?;

        self.ui.update_game_ui(&self.state)
    }

    fn check_items(&mut self) {
        if let Some(level) = self.level.as_mut() {
            let bounds = level.player.bounds();
            for item in level.stage.collect_items(&bounds) {
                self.state.score += item.kind.value();
                self.state.items_collected += 1;
            }
        }
    }

    fn check_obstacles(&mut self) {
        let level = match self.level.as_mut() {
            Some(level) => level,
            None => return,
        };
        if level.player.is_invulnerable() || self.game_over_countdown.is_some() {
            return;
        }

        let bounds = level.player.bounds();
        let hit = level
            .stage
            .obstacles
            .iter()
            .find(|obstacle| collision::triangle_hit(&bounds, &obstacle.rect))
            .map(|obstacle| obstacle.rect.center());

        if let Some(center) = hit {
            self.state.lives = self.state.lives.saturating_sub(1);
            level.player.take_damage(center.x, center.y);
            log!("Hit a spike, {} lives left", self.state.lives);

            if self.state.lives == 0 {
                self.game_over_countdown = Some(GAME_OVER_DELAY);
            }
        }
    }

    fn check_fall(&mut self) -> Result<()> {
        if self.game_over_countdown.is_some() {
            return Ok(());
        }
        let fell = match self.level.as_ref() {
            Some(level) => {
                !level.player.is_grounded()
                    && level.player.position().y > level.stage.ground_level + FALL_DEATH_DEPTH
            }
            None => false,
        };
        if !fell {
            return Ok(());
        }

        self.state.lives = self.state.lives.saturating_sub(1);
        log!("Fell off the stage, {} lives left", self.state.lives);

        if self.state.lives > 0 {
            if let Some(level) = self.level.as_mut() {
                level.player.respawn();
            }
            Ok(())
        } else {
            self.game_over()
        }
    }

    fn check_goal(&mut self) -> Result<()> {
        if self.phase == Phase::Completing || self.game_over_countdown.is_some() {
            return Ok(());
        }
        let reached = self
            .level
            .as_ref()
            .map(|level| level.player.bounds().intersects(&level.stage.goal.rect))
            .unwrap_or(false);

        if reached {
            self.complete_stage()
        } else {
            Ok(())
        }
    }

    fn count_down_game_over(&mut self, dt: f32) -> Result<()> {
        match self.game_over_countdown {
            Some(remaining) if remaining - dt <= 0.0 => self.game_over(),
            Some(remaining) => {
                self.game_over_countdown = Some(remaining - dt);
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn complete_stage(&mut self) -> Result<()> {
        let next = self.phase.transition(SessionEvent::ReachGoal);
        if next == self.phase {
            return Ok(());
        }
        self.phase = next;

        let number = self.stage().map(|stage| stage.number).unwrap_or(1);
        let stats = StageStats::from(&self.state);
        log!(
            "Stage {} clear: score {} in {:.1}s",
            number,
            stats.score,
            stats.time
        );

        if let Err(err) = self.progress.save_stage_completion(number, &stats) {
            error!("Could not save progress for stage {}: {:#?}", number, err);
        }
        self.ui.show_game_clear(number, &stats)
    }

    fn game_over(&mut self) -> Result<()> {
        let next = self.phase.transition(SessionEvent::RunOutOfLives);
        if next == self.phase {
            return Ok(());
        }
        self.phase = next;
        self.game_over_countdown = None;
        log!("Game over");

        self.ui.show_game_over(&self.state)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn stage(&self) -> Option<&Stage> {
        self.level.as_ref().map(|level| &level.stage)
    }

    pub fn player(&self) -> Option<&Player> {
        self.level.as_ref().map(|level| &level.player)
    }

    #[cfg(test)]
    pub fn player_mut(&mut self) -> Option<&mut Player> {
        self.level.as_mut().map(|level| &mut level.player)
    }
}
