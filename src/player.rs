use crate::{
    collision::{self, Body, Grounding},
    engine::{Point, Rect},
    input::{Action, InputEvent, InputState},
    stage::Stage,
};

// Tuned for a ~60fps tick. The multiplicative factors (friction and
// knockback decay) are applied once per update call, not scaled by dt.
const PLAYER_SIZE: f32 = 32.0;
const RUN_SPEED: f32 = 200.0;
const FRICTION: f32 = 0.8;
const CROUCH_SLOWDOWN: f32 = 0.5;
const JUMP_SPEED: f32 = -450.0;
const DOUBLE_JUMP_FACTOR: f32 = 0.8;
const GRAVITY: f32 = 1200.0;
const TERMINAL_VELOCITY: f32 = 600.0;
const KNOCKBACK_SPEED_X: f32 = 400.0;
const KNOCKBACK_SPEED_Y: f32 = -350.0;
const KNOCKBACK_DECAY_X: f32 = 0.92;
const KNOCKBACK_DECAY_Y: f32 = 0.88;
const KNOCKBACK_REST: f32 = 15.0;
const KNOCKBACK_CONTROL_LOCK: f32 = 30.0;
const DAMAGE_INVULNERABILITY: f32 = 2.0;
const RESPAWN_INVULNERABILITY: f32 = 1.0;
const DAMAGE_FLASH: f32 = 1.0;
const WALKING_THRESHOLD: f32 = 10.0;
const ANIMATION_FRAMES: u8 = 24;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Facing {
    Left,
    Right,
}

/// Cosmetic posture, derived from the physical state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Animation {
    Idle,
    Walking,
    Jumping,
    Crouching,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Countdown {
    remaining: f32,
}

impl Countdown {
    fn start(&mut self, seconds: f32) {
        self.remaining = seconds;
    }

    fn is_active(&self) -> bool {
        self.remaining > 0.0
    }

    fn tick(&mut self, dt: f32) {
        self.remaining = (self.remaining - dt).max(0.0);
    }

    fn clear(&mut self) {
        self.remaining = 0.0;
    }
}

#[derive(Clone, Debug)]
pub struct Player {
    body: Body,
    spawn: Point,
    facing: Facing,
    jumping: bool,
    can_double_jump: bool,
    has_double_jumped: bool,
    invulnerability: Countdown,
    damage_flash: Countdown,
    knockback: Point,
    input: InputState,
    frame: u8,
}

impl Player {
    pub fn new(spawn: Point) -> Self {
        Player {
            body: Body::new(spawn, PLAYER_SIZE, PLAYER_SIZE),
            spawn,
            facing: Facing::Right,
            jumping: false,
            can_double_jump: false,
            has_double_jumped: false,
            invulnerability: Countdown::default(),
            damage_flash: Countdown::default(),
            knockback: Point::default(),
            input: InputState::default(),
            frame: 0,
        }
    }

    pub fn handle_input(&mut self, event: InputEvent) {
        let rising = self.input.set(event.action, event.pressed);
        if event.action == Action::Jump && rising {
            self.attempt_jump();
        }
    }

    /// First jump from the ground, one weaker jump in the air, never a third.
    pub fn attempt_jump(&mut self) -> bool {
        if self.body.grounded && !self.jumping {
            self.body.velocity.y = JUMP_SPEED;
            self.body.grounded = false;
            self.jumping = true;
            self.can_double_jump = true;
            self.has_double_jumped = false;
            true
        } else if !self.body.grounded && self.can_double_jump && !self.has_double_jumped {
            self.body.velocity.y = JUMP_SPEED * DOUBLE_JUMP_FACTOR;
            self.jumping = true;
            self.can_double_jump = false;
            self.has_double_jumped = true;
            true
        } else {
            false
        }
    }

    /// Knocks the player away from the obstacle at (`obstacle_x`, `obstacle_y`).
    /// Does nothing and returns false while invulnerable.
    pub fn take_damage(&mut self, obstacle_x: f32, _obstacle_y: f32) -> bool {
        if self.invulnerability.is_active() {
            return false;
        }

        let direction = if self.body.bounds().center().x < obstacle_x {
            -1.0
        } else {
            1.0
        };
        self.knockback = Point {
            x: KNOCKBACK_SPEED_X * direction,
            y: KNOCKBACK_SPEED_Y,
        };
        self.body.velocity = self.knockback;
        self.body.grounded = false;
        self.body.crouching = false;
        self.damage_flash.start(DAMAGE_FLASH);
        self.invulnerability.start(DAMAGE_INVULNERABILITY);
        true
    }

    pub fn respawn(&mut self) {
        self.body.position = self.spawn;
        self.body.velocity = Point::default();
        self.body.grounded = false;
        self.body.crouching = false;
        self.knockback = Point::default();
        self.jumping = false;
        self.can_double_jump = false;
        self.has_double_jumped = false;
        self.damage_flash.clear();
        self.invulnerability.start(RESPAWN_INVULNERABILITY);
    }

    /// One tick: input, physics, collision, animation, timers. Without a
    /// stage only input, animation and timers run.
    pub fn update(&mut self, dt: f32, stage: Option<&Stage>) {
        self.process_input();

        if let Some(stage) = stage {
            self.integrate(dt);
            if collision::resolve(&mut self.body, stage) != Grounding::Airborne {
                self.land();
            }
        }

        self.frame = (self.frame + 1) % ANIMATION_FRAMES;
        self.damage_flash.tick(dt);
        self.invulnerability.tick(dt);
    }

    fn process_input(&mut self) {
        if !self.is_control_locked() {
            if self.input.left {
                self.body.velocity.x = -RUN_SPEED;
                self.facing = Facing::Left;
            } else if self.input.right {
                self.body.velocity.x = RUN_SPEED;
                self.facing = Facing::Right;
            } else {
                self.body.velocity.x *= FRICTION;
            }
        }

        self.body.crouching = self.input.crouch && self.body.grounded;
        if self.body.crouching {
            self.body.velocity.x *= CROUCH_SLOWDOWN;
        }
    }

    fn integrate(&mut self, dt: f32) {
        if !self.body.grounded {
            self.body.velocity.y = (self.body.velocity.y + GRAVITY * dt).min(TERMINAL_VELOCITY);
        }

        if self.is_control_locked() {
            self.body.velocity.x = self.knockback.x;
        }
        self.knockback.x = decay(self.knockback.x, KNOCKBACK_DECAY_X);
        self.knockback.y = decay(self.knockback.y, KNOCKBACK_DECAY_Y);

        self.body.position.x += self.body.velocity.x * dt;
        self.body.position.y += self.body.velocity.y * dt;
    }

    /// Any surface counts, so walking off it afterwards gives no air jump.
    fn land(&mut self) {
        self.jumping = false;
        self.can_double_jump = false;
        self.has_double_jumped = false;
        self.knockback.y = 0.0;
    }

    fn is_control_locked(&self) -> bool {
        self.knockback.x.abs() > KNOCKBACK_CONTROL_LOCK
            || self.knockback.y.abs() > KNOCKBACK_CONTROL_LOCK
    }

    pub fn bounds(&self) -> Rect {
        self.body.bounds()
    }

    pub fn position(&self) -> Point {
        self.body.position
    }

    #[cfg(test)]
    pub fn set_position(&mut self, position: Point) {
        self.body.position = position;
    }

    pub fn velocity(&self) -> Point {
        self.body.velocity
    }

    pub fn knockback(&self) -> Point {
        self.knockback
    }

    pub fn facing(&self) -> Facing {
        self.facing
    }

    pub fn is_grounded(&self) -> bool {
        self.body.grounded
    }

    pub fn is_jumping(&self) -> bool {
        self.jumping
    }

    pub fn is_crouching(&self) -> bool {
        self.body.crouching
    }

    pub fn is_knocked_back(&self) -> bool {
        self.knockback != Point::default()
    }

    pub fn is_invulnerable(&self) -> bool {
        self.invulnerability.is_active()
    }

    pub fn invulnerable_remaining(&self) -> f32 {
        self.invulnerability.remaining
    }

    pub fn is_damaged(&self) -> bool {
        self.damage_flash.is_active()
    }

    pub fn has_double_jumped(&self) -> bool {
        self.has_double_jumped
    }

    pub fn frame(&self) -> u8 {
        self.frame
    }

    pub fn animation(&self) -> Animation {
        if self.body.crouching {
            Animation::Crouching
        } else if !self.body.grounded {
            Animation::Jumping
        } else if self.body.velocity.x.abs() > WALKING_THRESHOLD {
            Animation::Walking
        } else {
            Animation::Idle
        }
    }
}

fn decay(speed: f32, factor: f32) -> f32 {
    let speed = speed * factor;
    if speed.abs() < KNOCKBACK_REST {
        0.0
    } else {
        speed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;
    const GROUND: f32 = 480.0;

    fn stage() -> Stage {
        Stage::new(1, 3000.0, 600.0)
    }

    fn grounded_player(stage: &Stage) -> Player {
        let mut player = Player::new(stage.spawn);
        player.update(DT, Some(stage));
        assert!(player.is_grounded());
        player
    }

    #[test]
    fn spawned_player_settles_on_the_ground() {
        let stage = stage();
        let player = grounded_player(&stage);

        assert_eq!(player.bounds().bottom(), GROUND);
        assert_eq!(player.velocity().y, 0.0);
        assert_eq!(player.animation(), Animation::Idle);
    }

    #[test]
    fn double_jump_then_nothing() {
        let stage = stage();
        let mut player = grounded_player(&stage);

        assert!(player.attempt_jump());
        assert_eq!(player.velocity().y, -450.0);
        assert!(!player.is_grounded());

        assert!(player.attempt_jump());
        assert_eq!(player.velocity().y, -450.0 * 0.8);
        assert!(player.has_double_jumped());

        assert!(!player.attempt_jump());
        assert_eq!(player.velocity().y, -450.0 * 0.8);
    }

    #[test]
    fn jump_fires_only_on_the_rising_edge() {
        let stage = stage();
        let mut player = grounded_player(&stage);

        player.handle_input(InputEvent::press(Action::Jump));
        player.update(DT, Some(&stage));
        let vy = player.velocity().y;
        player.handle_input(InputEvent::press(Action::Jump));

        assert_eq!(player.velocity().y, vy);
        assert!(!player.has_double_jumped());

        player.handle_input(InputEvent::release(Action::Jump));
        player.handle_input(InputEvent::press(Action::Jump));
        assert!(player.has_double_jumped());
    }

    #[test]
    fn walking_off_a_ledge_gives_no_air_jump() {
        let mut stage = stage();
        stage
            .platforms
            .push(Rect::new_from_x_y(0.0, 300.0, 200.0, 20.0));
        let mut player = Player::new(Point { x: 150.0, y: 268.0 });
        player.update(DT, Some(&stage));
        assert!(player.is_grounded());

        player.handle_input(InputEvent::press(Action::Right));
        while player.is_grounded() {
            player.update(DT, Some(&stage));
        }

        assert!(!player.attempt_jump());
    }

    #[test]
    fn walking_off_a_wall_top_gives_no_air_jump() {
        let mut stage = stage();
        stage
            .walls
            .push(Rect::new_from_x_y(300.0, GROUND - 40.0, 100.0, 40.0));
        let mut player = grounded_player(&stage);
        assert!(player.attempt_jump());

        player.body.position = Point {
            x: 320.0,
            y: GROUND - 40.0 - 32.0 - 1.0,
        };
        player.body.velocity.y = 100.0;
        player.update(DT, Some(&stage));
        assert!(player.is_grounded());
        assert_eq!(player.bounds().bottom(), GROUND - 40.0);

        player.body.position.x = 410.0;
        player.update(DT, Some(&stage));
        assert!(!player.is_grounded());

        assert!(!player.attempt_jump());
    }

    #[test]
    fn landing_restores_both_jumps() {
        let stage = stage();
        let mut player = grounded_player(&stage);
        player.attempt_jump();
        player.attempt_jump();

        for _ in 0..120 {
            player.update(DT, Some(&stage));
        }

        assert!(player.is_grounded());
        assert!(!player.is_jumping());
        assert!(player.attempt_jump());
        assert!(player.attempt_jump());
    }

    #[test]
    fn gravity_is_capped_at_terminal_velocity() {
        let stage = stage();
        let mut player = Player::new(Point { x: 100.0, y: -2000.0 });

        for _ in 0..60 {
            player.update(DT, Some(&stage));
        }

        assert_eq!(player.velocity().y, 600.0);
    }

    #[test]
    fn held_direction_sets_speed_and_facing() {
        let stage = stage();
        let mut player = grounded_player(&stage);

        player.handle_input(InputEvent::press(Action::Left));
        player.update(DT, Some(&stage));

        assert_eq!(player.velocity().x, -200.0);
        assert_eq!(player.facing(), Facing::Left);
        assert_eq!(player.animation(), Animation::Walking);
    }

    #[test]
    fn releasing_direction_applies_per_tick_friction() {
        let stage = stage();
        let mut player = grounded_player(&stage);
        player.handle_input(InputEvent::press(Action::Right));
        player.update(DT, Some(&stage));

        player.handle_input(InputEvent::release(Action::Right));
        player.update(DT, Some(&stage));
        assert!((player.velocity().x - 160.0).abs() < 1e-3);

        player.update(0.001, Some(&stage));
        assert!((player.velocity().x - 128.0).abs() < 1e-3);
    }

    #[test]
    fn crouch_halves_speed_and_height_on_the_ground_only() {
        let stage = stage();
        let mut player = grounded_player(&stage);
        player.handle_input(InputEvent::press(Action::Right));
        player.handle_input(InputEvent::press(Action::Crouch));

        player.update(DT, Some(&stage));

        assert!(player.is_crouching());
        assert_eq!(player.velocity().x, 100.0);
        assert_eq!(player.bounds().height, 16.0);
        assert_eq!(player.bounds().bottom(), GROUND);
        assert_eq!(player.animation(), Animation::Crouching);

        player.attempt_jump();
        player.update(DT, Some(&stage));
        assert!(!player.is_crouching());
        assert_eq!(player.velocity().x, 200.0);
    }

    #[test]
    fn damage_knocks_away_from_the_obstacle() {
        let stage = stage();
        let mut player = grounded_player(&stage);
        let center = player.bounds().center();

        assert!(player.take_damage(center.x + 20.0, center.y));

        assert_eq!(player.velocity(), Point { x: -400.0, y: -350.0 });
        assert!(!player.is_grounded());
        assert!(player.is_invulnerable());
        assert!(player.is_damaged());
        assert!(player.is_knocked_back());
    }

    #[test]
    fn damage_while_invulnerable_changes_nothing() {
        let stage = stage();
        let mut player = grounded_player(&stage);
        player.take_damage(0.0, GROUND);
        player.update(DT, Some(&stage));
        let knockback = player.knockback();
        let remaining = player.invulnerable_remaining();

        assert!(!player.take_damage(1000.0, GROUND));

        assert_eq!(player.knockback(), knockback);
        assert_eq!(player.invulnerable_remaining(), remaining);
    }

    #[test]
    fn knockback_blocks_input_then_decays_away() {
        let stage = stage();
        let mut player = Player::new(Point {
            x: 1000.0,
            y: GROUND - 32.0,
        });
        player.update(DT, Some(&stage));
        player.handle_input(InputEvent::press(Action::Left));
        player.take_damage(900.0, GROUND);

        player.update(DT, Some(&stage));
        assert_eq!(player.velocity().x, 400.0);
        assert_eq!(player.facing(), Facing::Right);

        for _ in 0..120 {
            player.update(DT, Some(&stage));
        }

        assert!(!player.is_knocked_back());
        assert_eq!(player.velocity().x, -200.0);
        assert_eq!(player.facing(), Facing::Left);
    }

    #[test]
    fn landing_clears_vertical_knockback() {
        let stage = stage();
        let mut player = grounded_player(&stage);
        player.take_damage(0.0, GROUND);

        while !player.is_grounded() {
            player.update(DT, Some(&stage));
        }

        assert_eq!(player.knockback().y, 0.0);
    }

    #[test]
    fn invulnerability_and_damage_flash_run_out() {
        let stage = stage();
        let mut player = grounded_player(&stage);
        player.take_damage(0.0, GROUND);

        for _ in 0..61 {
            player.update(DT, Some(&stage));
        }
        assert!(!player.is_damaged());
        assert!(player.is_invulnerable());

        for _ in 0..61 {
            player.update(DT, Some(&stage));
        }
        assert!(!player.is_invulnerable());
    }

    #[test]
    fn respawn_resets_to_spawn_with_short_invulnerability() {
        let stage = stage();
        let mut player = grounded_player(&stage);
        player.take_damage(0.0, GROUND);
        player.set_position(Point { x: 900.0, y: 900.0 });

        player.respawn();

        assert_eq!(player.position(), stage.spawn);
        assert_eq!(player.velocity(), Point::default());
        assert!(!player.is_knocked_back());
        assert!(!player.is_damaged());
        assert!(!player.is_jumping());
        assert!((player.invulnerable_remaining() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn update_without_stage_skips_physics() {
        let mut player = Player::new(Point { x: 100.0, y: 100.0 });
        player.handle_input(InputEvent::press(Action::Right));

        player.update(DT, None);

        assert_eq!(player.position(), Point { x: 100.0, y: 100.0 });
        assert_eq!(player.velocity().y, 0.0);
        assert_eq!(player.frame(), 1);
    }

    #[test]
    fn jumping_onto_a_platform_lands_on_top() {
        let stage = {
            let mut stage = stage();
            stage
                .platforms
                .push(Rect::new_from_x_y(300.0, GROUND - 50.0, 120.0, 20.0));
            stage
        };
        let mut player = Player::new(Point {
            x: 100.0,
            y: GROUND - 32.0,
        });
        player.handle_input(InputEvent::press(Action::Right));

        let mut jumped = false;
        let mut landed_on = None;
        for _ in 0..300 {
            player.update(DT, Some(&stage));
            if !jumped && player.is_grounded() && player.position().x >= 230.0 {
                player.handle_input(InputEvent::press(Action::Jump));
                jumped = true;
            } else if jumped && player.is_grounded() {
                landed_on = Some(player.bounds().bottom());
                break;
            }
        }

        assert_eq!(landed_on, Some(GROUND - 50.0));
        assert!(player.position().x > 300.0 - 32.0 && player.position().x < 420.0);
        assert_eq!(player.velocity().y, 0.0);
    }
}
