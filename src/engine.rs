use crate::{
    browser::{self, LoopClosure},
    input::{InputEvent, KeyboardInput},
};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::channel::mpsc::{unbounded, UnboundedReceiver};
use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlElement};

/// Longest step the simulation is ever asked to integrate, in seconds.
const MAX_FRAME_DELTA: f64 = 1.0 / 30.0;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub position: Point,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(position: Point, width: f32, height: f32) -> Self {
        Rect {
            position,
            width,
            height,
        }
    }

    pub const fn new_from_x_y(x: f32, y: f32, width: f32, height: f32) -> Self {
        Rect::new(Point { x, y }, width, height)
    }

    pub fn intersects(&self, rect: &Rect) -> bool {
        self.x() < rect.right()
            && self.right() > rect.x()
            && self.y() < rect.bottom()
            && self.bottom() > rect.y()
    }

    /// Edges count as inside.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x() && point.x <= self.right() && point.y >= self.y() && point.y <= self.bottom()
    }

    pub fn center(&self) -> Point {
        Point {
            x: self.x() + self.width / 2.0,
            y: self.y() + self.height / 2.0,
        }
    }

    /// Top-left, top-right, bottom-right, bottom-left.
    pub fn corners(&self) -> [Point; 4] {
        [
            Point {
                x: self.x(),
                y: self.y(),
            },
            Point {
                x: self.right(),
                y: self.y(),
            },
            Point {
                x: self.right(),
                y: self.bottom(),
            },
            Point {
                x: self.x(),
                y: self.bottom(),
            },
        ]
    }

    pub fn x(&self) -> f32 {
        self.position.x
    }

    pub fn y(&self) -> f32 {
        self.position.y
    }

    pub fn right(&self) -> f32 {
        self.x() + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y() + self.height
    }
}

pub struct Renderer {
    context: CanvasRenderingContext2d,
}

impl Renderer {
    pub fn new(context: CanvasRenderingContext2d) -> Self {
        Renderer { context }
    }

    pub fn clear(&self, rect: &Rect) {
        self.context.clear_rect(
            rect.x().into(),
            rect.y().into(),
            rect.width.into(),
            rect.height.into(),
        );
    }

    pub fn fill_rect(&self, rect: &Rect, color: &str) {
        self.context.set_fill_style(&JsValue::from_str(color));
        self.context.fill_rect(
            rect.x().into(),
            rect.y().into(),
            rect.width.into(),
            rect.height.into(),
        );
    }

    /// Fills the upward triangle inscribed in `rect`, apex at top-center.
    pub fn fill_triangle(&self, rect: &Rect, color: &str) {
        self.context.set_fill_style(&JsValue::from_str(color));
        self.context.begin_path();
        self.context.move_to(rect.x().into(), rect.bottom().into());
        self.context
            .line_to(rect.center().x.into(), rect.y().into());
        self.context.line_to(rect.right().into(), rect.bottom().into());
        self.context.close_path();
        self.context.fill();
    }

    pub fn save(&self) {
        self.context.save();
    }

    pub fn restore(&self) {
        self.context.restore();
    }

    pub fn translate(&self, x: f32, y: f32) -> Result<()> {
        self.context
            .translate(x.into(), y.into())
            .map_err(|err| anyhow!("Could not translate canvas {:#?}", err))
    }
}

#[async_trait(?Send)]
pub trait Game {
    async fn initialize(&self) -> Result<Box<dyn Game>>;
    fn update(&mut self, input: &[InputEvent], dt: f32) -> Result<()>;
    fn draw(&self, renderer: &Renderer) -> Result<()>;

    /// Once this turns false the loop schedules no further frames.
    fn is_running(&self) -> bool {
        true
    }
}

pub struct FrameClock {
    last_frame: f64,
}

impl FrameClock {
    pub fn new(now: f64) -> Self {
        FrameClock { last_frame: now }
    }

    /// Seconds elapsed since the previous tick, clamped to `MAX_FRAME_DELTA`.
    /// `now` is in milliseconds, as handed out by `requestAnimationFrame`.
    pub fn tick(&mut self, now: f64) -> f32 {
        let delta = ((now - self.last_frame) / 1000.0).clamp(0.0, MAX_FRAME_DELTA);
        self.last_frame = now;
        delta as f32
    }
}

#[derive(Clone)]
pub struct LoopHandle {
    running: Rc<Cell<bool>>,
}

impl LoopHandle {
    fn new() -> Self {
        LoopHandle {
            running: Rc::new(Cell::new(true)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.get()
    }

    /// Takes effect before the next scheduled frame. Calling it again does nothing.
    pub fn stop(&self) {
        self.running.set(false);
    }
}

pub struct GameLoop;

type SharedLoopClosure = Rc<RefCell<Option<LoopClosure>>>;

impl GameLoop {
    pub async fn start(game: impl Game + 'static) -> Result<LoopHandle> {
        let mut keyevent_receiver = prepare_input()?;
        let mut keyboard = KeyboardInput::default();
        let mut game = game.initialize().await?;
        let mut clock = FrameClock::new(browser::now()?);
        let renderer = Renderer::new(browser::context()?);
        let handle = LoopHandle::new();
        let loop_handle = handle.clone();

        let f: SharedLoopClosure = Rc::new(RefCell::new(None));
        let g = f.clone();

        *g.borrow_mut() = Some(browser::create_raf_closure(move |perf: f64| {
            if !loop_handle.is_running() {
                let _ = f.borrow_mut().take();
                return;
            }

            let events = process_input(&mut keyboard, &mut keyevent_receiver);
            let dt = clock.tick(perf);

            if !run_frame(game.as_mut(), &events, dt, |game| game.draw(&renderer)) {
                loop_handle.stop();
                let _ = f.borrow_mut().take();
                return;
            }

            if let Some(closure) = f.borrow().as_ref() {
                if let Err(err) = browser::request_animation_frame(closure) {
                    error!("Error scheduling next frame {:#?}", err);
                }
            }
        }));

        browser::request_animation_frame(
            g.borrow()
                .as_ref()
                .ok_or_else(|| anyhow!("GameLoop: Loop is None"))?,
        )?;

        Ok(handle)
    }
}

/// One tick of the loop. Errors from either step are logged and the draw
/// always runs. Returns whether another frame should be scheduled.
fn run_frame(
    game: &mut dyn Game,
    events: &[InputEvent],
    dt: f32,
    draw: impl FnOnce(&dyn Game) -> Result<()>,
) -> bool {
    if let Err(err) = game.update(events, dt) {
        error!("Error updating game {:#?}", err);
    }
    if let Err(err) = draw(&*game) {
        error!("Error drawing game {:#?}", err);
    }
    game.is_running()
}

pub fn add_click_handler(elem: HtmlElement) -> UnboundedReceiver<()> {
    let (click_sender, click_receiver) = unbounded();
    let on_click = browser::closure_wrap(Box::new(move || {
        let _ = click_sender.unbounded_send(());
    }) as Box<dyn FnMut()>);
    elem.set_onclick(Some(on_click.as_ref().unchecked_ref()));
    on_click.forget();
    click_receiver
}

enum KeyPress {
    KeyUp(web_sys::KeyboardEvent),
    KeyDown(web_sys::KeyboardEvent),
}

fn prepare_input() -> Result<UnboundedReceiver<KeyPress>> {
    let (keydown_sender, keyevent_receiver) = unbounded();
    let keydown_sender = Rc::new(RefCell::new(keydown_sender));
    let keyup_sender = Rc::clone(&keydown_sender);

    let onkeydown = browser::closure_wrap(Box::new(move |keycode: web_sys::KeyboardEvent| {
        let _ = keydown_sender
            .borrow_mut()
            .unbounded_send(KeyPress::KeyDown(keycode));
    }) as Box<dyn FnMut(web_sys::KeyboardEvent)>);

    let onkeyup = browser::closure_wrap(Box::new(move |keycode: web_sys::KeyboardEvent| {
        let _ = keyup_sender
            .borrow_mut()
            .unbounded_send(KeyPress::KeyUp(keycode));
    }) as Box<dyn FnMut(web_sys::KeyboardEvent)>);

    let canvas = browser::canvas()?;
    canvas.set_onkeydown(Some(onkeydown.as_ref().unchecked_ref()));
    canvas.set_onkeyup(Some(onkeyup.as_ref().unchecked_ref()));
    onkeydown.forget();
    onkeyup.forget();

    Ok(keyevent_receiver)
}

fn process_input(
    keyboard: &mut KeyboardInput,
    keyevent_receiver: &mut UnboundedReceiver<KeyPress>,
) -> Vec<InputEvent> {
    let mut events = Vec::new();
    loop {
        match keyevent_receiver.try_next() {
            Ok(None) => break,
            Err(_err) => break,
            Ok(Some(evt)) => {
                let translated = match evt {
                    KeyPress::KeyUp(evt) => keyboard.translate(&evt.code(), false),
                    KeyPress::KeyDown(evt) => keyboard.translate(&evt.code(), true),
                };
                events.extend(translated);
            }
        };
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    struct ScriptedGame {
        update_fails: bool,
        running: bool,
        updates: u32,
    }

    impl ScriptedGame {
        fn new(update_fails: bool, running: bool) -> Self {
            ScriptedGame {
                update_fails,
                running,
                updates: 0,
            }
        }
    }

    #[async_trait(?Send)]
    impl Game for ScriptedGame {
        async fn initialize(&self) -> Result<Box<dyn Game>> {
            Err(anyhow!("ScriptedGame is built directly"))
        }

        fn update(&mut self, _input: &[InputEvent], _dt: f32) -> Result<()> {
            self.updates += 1;
            if self.update_fails {
                Err(anyhow!("update blew up"))
            } else {
                Ok(())
            }
        }

        fn draw(&self, _renderer: &Renderer) -> Result<()> {
            Ok(())
        }

        fn is_running(&self) -> bool {
            self.running
        }
    }

    #[test]
    fn failed_update_still_draws_and_keeps_looping() {
        let mut game = ScriptedGame::new(true, true);
        let draws = Cell::new(0);

        let again = run_frame(&mut game, &[], DT, |_game| {
            draws.set(draws.get() + 1);
            Ok(())
        });

        assert!(again);
        assert_eq!(game.updates, 1);
        assert_eq!(draws.get(), 1);
    }

    #[test]
    fn failed_draw_keeps_looping() {
        let mut game = ScriptedGame::new(false, true);

        let again = run_frame(&mut game, &[], DT, |_game| Err(anyhow!("no canvas")));

        assert!(again);
        assert_eq!(game.updates, 1);
    }

    #[test]
    fn finished_game_draws_its_last_frame_then_stops() {
        let mut game = ScriptedGame::new(false, false);
        let draws = Cell::new(0);

        let again = run_frame(&mut game, &[], DT, |game| {
            assert!(!game.is_running());
            draws.set(draws.get() + 1);
            Ok(())
        });

        assert!(!again);
        assert_eq!(draws.get(), 1);
    }

    #[test]
    fn frame_clock_reports_seconds() {
        let mut clock = FrameClock::new(1000.0);

        let dt = clock.tick(1016.0);

        assert!((dt - 0.016).abs() < 1e-6);
    }

    #[test]
    fn frame_clock_clamps_long_frames() {
        let mut clock = FrameClock::new(0.0);

        let dt = clock.tick(5000.0);

        assert!((dt - 1.0 / 30.0).abs() < 1e-6);
        assert!((clock.tick(5010.0) - 0.01).abs() < 1e-6);
    }

    #[test]
    fn frame_clock_never_goes_backwards() {
        let mut clock = FrameClock::new(100.0);

        assert_eq!(clock.tick(50.0), 0.0);
    }

    #[test]
    fn loop_handle_stop_is_idempotent() {
        let handle = LoopHandle::new();
        let other = handle.clone();

        handle.stop();
        handle.stop();

        assert!(!other.is_running());
    }

    #[test]
    fn rect_intersection_excludes_touching_edges() {
        let a = Rect::new_from_x_y(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new_from_x_y(10.0, 0.0, 10.0, 10.0);
        let c = Rect::new_from_x_y(9.0, 9.0, 10.0, 10.0);

        assert!(!a.intersects(&b));
        assert!(a.intersects(&c));
        assert!(a.contains(Point { x: 10.0, y: 10.0 }));
    }
}
