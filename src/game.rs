use crate::{
    browser,
    camera::Camera,
    engine::{self, Game, GameLoop, Point, Rect, Renderer},
    input::InputEvent,
    player::{Animation, Facing, Player},
    session::Session,
    stage::{BuiltinStages, Gap, ItemKind, Stage, STAGE_COUNT},
    storage::LocalStorageProgress,
    ui::{DomUi, CONTINUE_BUTTON_ID},
};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::StreamExt;

const SKY_COLOR: &str = "#bfe6ff";
const GROUND_COLOR: &str = "#7ac74f";
const DIRT_COLOR: &str = "#a0522d";
const PLATFORM_COLOR: &str = "#c68642";
const WALL_COLOR: &str = "#8d99ae";
const SPIKE_COLOR: &str = "#6c757d";
const POLE_COLOR: &str = "#5c4033";
const FLAG_COLOR: &str = "#ff4d6d";
const PLAYER_COLOR: &str = "#4a90e2";
const HURT_COLOR: &str = "#ff6b6b";
const EYE_COLOR: &str = "#ffffff";
/// Extra ground drawn below the canvas so the camera never shows its edge.
const GROUND_OVERDRAW: f32 = 400.0;
const BLINK_INTERVAL: f32 = 0.1;
const POLE_WIDTH: f32 = 6.0;

pub struct Level {
    session: Session,
    camera: Camera,
    continue_offered: bool,
}

impl Level {
    /// Wires the overlay button once the stage has ended.
    fn offer_next_stage(&mut self) -> Result<()> {
        if self.continue_offered {
            return Ok(());
        }
        if let Some(next) = self.session.next_stage() {
            self.continue_offered = true;
            start_on_click(next)?;
        }
        Ok(())
    }

    fn follow_player(&mut self) {
        let elapsed = self.session.state().elapsed;
        if let (Some(stage), Some(player)) = (self.session.stage(), self.session.player()) {
            self.camera.update(player.position(), stage.width, elapsed);
        }
    }

    fn draw(&self, renderer: &Renderer) -> Result<()> {
        let (width, height) = self.camera.viewport();
        let screen = Rect::new_from_x_y(0.0, 0.0, width, height);
        renderer.clear(&screen);
        renderer.fill_rect(&screen, SKY_COLOR);

        let (stage, player) = match (self.session.stage(), self.session.player()) {
            (Some(stage), Some(player)) => (stage, player),
            _ => return Ok(()),
        };

        let camera = self.camera.position();
        renderer.save();
        let translated = renderer.translate(-camera.x, -camera.y);
        if translated.is_ok() {
            draw_stage(renderer, stage);
            draw_player(renderer, player);
        }
        renderer.restore();

        translated
    }
}

pub enum PlatformGame {
    Loading { stage: Option<u32> },
    Loaded(Level),
}

impl PlatformGame {
    /// Resumes after the highest stage cleared so far.
    pub fn new() -> Self {
        PlatformGame::Loading { stage: None }
    }

    pub fn at_stage(stage: u32) -> Self {
        PlatformGame::Loading { stage: Some(stage) }
    }
}

#[async_trait(?Send)]
impl Game for PlatformGame {
    async fn initialize(&self) -> Result<Box<dyn Game>> {
        match self {
            PlatformGame::Loading { stage } => {
                let canvas = browser::canvas()?;
                let width = canvas.width() as f32;
                let height = canvas.height() as f32;

                let progress = LocalStorageProgress::new()?;
                let first_stage = match stage {
                    Some(stage) => *stage,
                    None => progress
                        .load()
                        .map(|saved| saved.highest_cleared().map_or(1, |cleared| cleared + 1))
                        .unwrap_or(1)
                        .min(STAGE_COUNT),
                };

                let mut session = Session::new(
                    height,
                    Box::new(BuiltinStages),
                    Box::new(progress),
                    Box::new(DomUi),
                );
                session.start_stage(first_stage)?;

                let mut level = Level {
                    session,
                    camera: Camera::new(width, height),
                    continue_offered: false,
                };
                level.follow_player();

                if let Err(err) = browser::focus_canvas() {
                    error!("Keyboard input may need a click first {:#?}", err);
                }

                Ok(Box::new(PlatformGame::Loaded(level)))
            }
            PlatformGame::Loaded(_) => Err(anyhow!("Error: Game is already initialized!")),
        }
    }

    fn update(&mut self, input: &[InputEvent], dt: f32) -> Result<()> {
        if let PlatformGame::Loaded(level) = self {
            level.session.update(input, dt)?;
            level.follow_player();
            level.offer_next_stage()?;
        }
        Ok(())
    }

    fn draw(&self, renderer: &Renderer) -> Result<()> {
        match self {
            PlatformGame::Loaded(level) => level.draw(renderer),
            PlatformGame::Loading { .. } => Ok(()),
        }
    }

    fn is_running(&self) -> bool {
        match self {
            PlatformGame::Loaded(level) => level.session.is_running(),
            PlatformGame::Loading { .. } => true,
        }
    }
}

/// Starts a fresh loop on `stage_number` when the continue button is pressed.
/// The button takes focus so Enter or Space works too.
fn start_on_click(stage_number: u32) -> Result<()> {
    let button = browser::find_html_element_by_id(CONTINUE_BUTTON_ID)?;
    button
        .focus()
        .map_err(|err| anyhow!("Could not focus the continue button {:#?}", err))?;
    let mut clicks = engine::add_click_handler(button);

    browser::spawn_local(async move {
        if clicks.next().await.is_some() {
            if let Err(err) = GameLoop::start(PlatformGame::at_stage(stage_number)).await {
                error!("Could not start stage {} {:#?}", stage_number, err);
            }
        }
    });
    Ok(())
}

fn draw_stage(renderer: &Renderer, stage: &Stage) {
    draw_ground(renderer, stage);

    stage
        .platforms
        .iter()
        .for_each(|platform| renderer.fill_rect(platform, PLATFORM_COLOR));
    stage
        .walls
        .iter()
        .for_each(|wall| renderer.fill_rect(wall, WALL_COLOR));
    stage
        .items
        .iter()
        .filter(|item| item.active)
        .for_each(|item| renderer.fill_rect(&item.rect, item_color(item.kind)));
    stage
        .obstacles
        .iter()
        .for_each(|obstacle| renderer.fill_triangle(&obstacle.rect, SPIKE_COLOR));

    let goal = &stage.goal.rect;
    renderer.fill_rect(
        &Rect::new_from_x_y(goal.x(), goal.y(), POLE_WIDTH, goal.height),
        POLE_COLOR,
    );
    renderer.fill_triangle(
        &Rect::new_from_x_y(
            goal.x() + POLE_WIDTH,
            goal.y(),
            goal.width - POLE_WIDTH,
            goal.height / 3.0,
        ),
        FLAG_COLOR,
    );
}

/// The ground is drawn in strips so pits stay open.
fn draw_ground(renderer: &Renderer, stage: &Stage) {
    let mut gaps = stage.gaps.clone();
    gaps.sort_by(|a, b| a.left.total_cmp(&b.left));

    let depth = stage.height - stage.ground_level + GROUND_OVERDRAW;
    let mut left: f32 = 0.0;
    let stage_end = Gap {
        left: stage.width,
        right: stage.width,
    };
    for gap in gaps.iter().chain(std::iter::once(&stage_end)) {
        if gap.left > left {
            let strip = Rect::new_from_x_y(left, stage.ground_level, gap.left - left, depth);
            renderer.fill_rect(&strip, DIRT_COLOR);
            renderer.fill_rect(
                &Rect::new_from_x_y(strip.x(), strip.y(), strip.width, 8.0),
                GROUND_COLOR,
            );
        }
        left = left.max(gap.right);
    }
}

fn draw_player(renderer: &Renderer, player: &Player) {
    if player.is_invulnerable() && blink_hidden(player.invulnerable_remaining()) {
        return;
    }

    let bounds = player.bounds();
    let color = if player.is_damaged() {
        HURT_COLOR
    } else {
        PLAYER_COLOR
    };
    renderer.fill_rect(&bounds, color);

    let eye_y = match player.animation() {
        Animation::Crouching => bounds.y() + 3.0,
        Animation::Jumping => bounds.y() + 5.0,
        Animation::Walking | Animation::Idle => bounds.y() + 8.0,
    };
    let eye_x = match player.facing() {
        Facing::Left => bounds.x() + 5.0,
        Facing::Right => bounds.right() - 11.0,
    };
    renderer.fill_rect(
        &Rect::new(Point { x: eye_x, y: eye_y }, 6.0, 6.0),
        EYE_COLOR,
    );
}

fn blink_hidden(remaining: f32) -> bool {
    ((remaining / BLINK_INTERVAL) as u32) % 2 == 1
}

fn item_color(kind: ItemKind) -> &'static str {
    match kind {
        ItemKind::Coin => "#ffd700",
        ItemKind::Star => "#ffef5a",
        ItemKind::Fruit => "#ff7f50",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_game_resumes_and_at_stage_pins_the_stage() {
        assert!(matches!(
            PlatformGame::new(),
            PlatformGame::Loading { stage: None }
        ));
        assert!(matches!(
            PlatformGame::at_stage(2),
            PlatformGame::Loading { stage: Some(2) }
        ));
    }

    #[test]
    fn invulnerable_player_blinks_every_tenth_of_a_second() {
        assert!(!blink_hidden(0.05));
        assert!(blink_hidden(0.15));
        assert!(!blink_hidden(0.25));
    }

    #[test]
    fn each_item_kind_has_its_own_color() {
        assert_ne!(item_color(ItemKind::Coin), item_color(ItemKind::Star));
        assert_ne!(item_color(ItemKind::Star), item_color(ItemKind::Fruit));
    }
}
