//! Static stage geometry and the built-in stage layouts.
//!
//! Coordinates are canvas pixels with a top-left origin. Everything below
//! `ground_level` is solid ground, except where a [`Gap`] cuts a pit into it.

use crate::engine::{Point, Rect};

pub const STAGE_COUNT: u32 = 3;

const GROUND_RATIO: f32 = 0.8;
const MIN_GROUND_LEVEL: f32 = 250.0;
const SPAWN_X: f32 = 100.0;
const PLAYER_SIZE: f32 = 32.0;
const ITEM_SIZE: f32 = 24.0;
const SPIKE_WIDTH: f32 = 32.0;
const SPIKE_HEIGHT: f32 = 28.0;
const GOAL_WIDTH: f32 = 40.0;
const GOAL_HEIGHT: f32 = 80.0;
const PLATFORM_HEIGHT: f32 = 20.0;

pub fn ground_level_for(canvas_height: f32) -> f32 {
    (canvas_height * GROUND_RATIO).max(MIN_GROUND_LEVEL)
}

pub trait Bounded {
    fn bounds(&self) -> Rect;
}

pub fn bounds_of(entity: &impl Bounded) -> Rect {
    entity.bounds()
}

impl Bounded for Rect {
    fn bounds(&self) -> Rect {
        *self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ItemKind {
    Coin,
    Star,
    Fruit,
}

impl ItemKind {
    pub fn value(&self) -> u32 {
        match self {
            ItemKind::Coin => 50,
            ItemKind::Star => 100,
            ItemKind::Fruit => 200,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Item {
    pub rect: Rect,
    pub kind: ItemKind,
    pub active: bool,
}

impl Item {
    pub fn new(x: f32, y: f32, kind: ItemKind) -> Self {
        Item {
            rect: Rect::new_from_x_y(x, y, ITEM_SIZE, ITEM_SIZE),
            kind,
            active: true,
        }
    }
}

impl Bounded for Item {
    fn bounds(&self) -> Rect {
        self.rect
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObstacleKind {
    Spike,
}

/// Hit-tested as the upward triangle inscribed in `rect`, never as the rect.
#[derive(Clone, Debug, PartialEq)]
pub struct Obstacle {
    pub rect: Rect,
    pub kind: ObstacleKind,
}

impl Obstacle {
    pub fn spike(x: f32, y: f32) -> Self {
        Obstacle {
            rect: Rect::new_from_x_y(x, y, SPIKE_WIDTH, SPIKE_HEIGHT),
            kind: ObstacleKind::Spike,
        }
    }

    /// A spike whose base sits on `surface`.
    pub fn spike_on(x: f32, surface: f32) -> Self {
        Obstacle::spike(x, surface - SPIKE_HEIGHT)
    }
}

impl Bounded for Obstacle {
    fn bounds(&self) -> Rect {
        self.rect
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Goal {
    pub rect: Rect,
}

impl Goal {
    pub fn flag_on(x: f32, surface: f32) -> Self {
        Goal {
            rect: Rect::new_from_x_y(x, surface - GOAL_HEIGHT, GOAL_WIDTH, GOAL_HEIGHT),
        }
    }
}

impl Bounded for Goal {
    fn bounds(&self) -> Rect {
        self.rect
    }
}

/// Horizontal span where the ground line is missing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Gap {
    pub left: f32,
    pub right: f32,
}

#[derive(Clone, Debug)]
pub struct Stage {
    pub number: u32,
    pub width: f32,
    pub height: f32,
    pub ground_level: f32,
    pub spawn: Point,
    pub platforms: Vec<Rect>,
    pub walls: Vec<Rect>,
    pub items: Vec<Item>,
    pub obstacles: Vec<Obstacle>,
    pub goal: Goal,
    pub gaps: Vec<Gap>,
}

impl Stage {
    /// An empty stage: flat ground, spawn at the left, flag at the far right.
    pub fn new(number: u32, width: f32, canvas_height: f32) -> Self {
        let ground_level = ground_level_for(canvas_height);
        Stage {
            number,
            width,
            height: canvas_height,
            ground_level,
            spawn: Point {
                x: SPAWN_X,
                y: ground_level - PLAYER_SIZE,
            },
            platforms: vec![],
            walls: vec![],
            items: vec![],
            obstacles: vec![],
            goal: Goal::flag_on(width - 2.0 * GOAL_WIDTH, ground_level),
            gaps: vec![],
        }
    }

    pub fn bounds(&self) -> Rect {
        Rect::new_from_x_y(0.0, 0.0, self.width, self.height)
    }

    /// False when `rect` lies entirely over a pit.
    pub fn has_ground_under(&self, rect: &Rect) -> bool {
        !self
            .gaps
            .iter()
            .any(|gap| rect.x() >= gap.left && rect.right() <= gap.right)
    }

    /// Removes every active item overlapping `bounds` and hands them back,
    /// already deactivated.
    pub fn collect_items(&mut self, bounds: &Rect) -> Vec<Item> {
        let (collected, remaining): (Vec<Item>, Vec<Item>) = std::mem::take(&mut self.items)
            .into_iter()
            .partition(|item| item.active && item.rect.intersects(bounds));
        self.items = remaining;

        collected
            .into_iter()
            .map(|mut item| {
                item.active = false;
                item
            })
            .collect()
    }

    fn platform(&mut self, x: f32, height_above_ground: f32, width: f32) -> &mut Self {
        self.platforms.push(Rect::new_from_x_y(
            x,
            self.ground_level - height_above_ground,
            width,
            PLATFORM_HEIGHT,
        ));
        self
    }

    fn wall(&mut self, x: f32, height: f32, width: f32) -> &mut Self {
        self.walls.push(Rect::new_from_x_y(
            x,
            self.ground_level - height,
            width,
            height,
        ));
        self
    }

    fn item(&mut self, x: f32, height_above_ground: f32, kind: ItemKind) -> &mut Self {
        let y = self.ground_level - height_above_ground;
        self.items.push(Item::new(x, y, kind));
        self
    }

    fn spike(&mut self, x: f32) -> &mut Self {
        let ground = self.ground_level;
        self.obstacles.push(Obstacle::spike_on(x, ground));
        self
    }

    fn spike_on_platform(&mut self, x: f32, height_above_ground: f32) -> &mut Self {
        let surface = self.ground_level - height_above_ground;
        self.obstacles.push(Obstacle::spike_on(x, surface));
        self
    }

    fn gap(&mut self, left: f32, right: f32) -> &mut Self {
        self.gaps.push(Gap { left, right });
        self
    }
}

pub trait StageProvider {
    /// Unknown numbers fall back to a default stage.
    fn stage(&self, number: u32, canvas_height: f32) -> Stage;
}

pub struct BuiltinStages;

impl StageProvider for BuiltinStages {
    fn stage(&self, number: u32, canvas_height: f32) -> Stage {
        match number {
            2 => stage_two(canvas_height),
            3 => stage_three(canvas_height),
            _ => stage_one(canvas_height),
        }
    }
}

fn stage_one(canvas_height: f32) -> Stage {
    let mut stage = Stage::new(1, 2400.0, canvas_height);
    stage
        .platform(300.0, 50.0, 120.0)
        .platform(560.0, 90.0, 140.0)
        .platform(900.0, 60.0, 160.0)
        .platform(1400.0, 100.0, 140.0)
        .item(250.0, 40.0, ItemKind::Coin)
        .item(350.0, 90.0, ItemKind::Coin)
        .item(620.0, 130.0, ItemKind::Star)
        .item(960.0, 100.0, ItemKind::Coin)
        .item(1200.0, 40.0, ItemKind::Fruit)
        .item(1450.0, 140.0, ItemKind::Star)
        .item(1900.0, 40.0, ItemKind::Coin)
        .spike(760.0)
        .spike(1650.0);
    stage
}

fn stage_two(canvas_height: f32) -> Stage {
    let mut stage = Stage::new(2, 3000.0, canvas_height);
    stage
        .platform(320.0, 60.0, 120.0)
        .platform(700.0, 110.0, 120.0)
        .platform(1500.0, 80.0, 160.0)
        .platform(2200.0, 120.0, 140.0)
        .wall(560.0, 60.0, 40.0)
        .wall(1150.0, 90.0, 60.0)
        .wall(1900.0, 70.0, 40.0)
        .item(360.0, 100.0, ItemKind::Coin)
        .item(740.0, 150.0, ItemKind::Star)
        .item(1165.0, 130.0, ItemKind::Fruit)
        .item(1560.0, 120.0, ItemKind::Coin)
        .item(2250.0, 160.0, ItemKind::Star)
        .item(2600.0, 40.0, ItemKind::Coin)
        .spike(900.0)
        .spike(1320.0)
        .spike(1700.0)
        .spike_on_platform(2300.0, 120.0);
    stage
}

fn stage_three(canvas_height: f32) -> Stage {
    let mut stage = Stage::new(3, 3600.0, canvas_height);
    stage
        .gap(600.0, 760.0)
        .gap(1800.0, 2000.0)
        .platform(420.0, 70.0, 120.0)
        .platform(620.0, 60.0, 110.0)
        .platform(1050.0, 100.0, 140.0)
        .platform(1820.0, 50.0, 160.0)
        .platform(2500.0, 110.0, 140.0)
        .wall(1400.0, 80.0, 50.0)
        .wall(2800.0, 100.0, 60.0)
        .item(460.0, 110.0, ItemKind::Coin)
        .item(660.0, 100.0, ItemKind::Star)
        .item(1100.0, 140.0, ItemKind::Fruit)
        .item(1880.0, 90.0, ItemKind::Coin)
        .item(2550.0, 150.0, ItemKind::Star)
        .item(2815.0, 140.0, ItemKind::Fruit)
        .spike(900.0)
        .spike(1600.0)
        .spike(2250.0)
        .spike(3100.0);
    stage
}
