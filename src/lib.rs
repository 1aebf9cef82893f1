#[macro_use]
mod browser;
pub mod camera;
pub mod collision;
pub mod engine;
mod game;
pub mod input;
pub mod player;
pub mod session;
pub mod stage;
pub mod storage;
mod ui;

use engine::GameLoop;
use game::PlatformGame;
use wasm_bindgen::prelude::*;

// This is like the `main` function, except for JavaScript.
#[wasm_bindgen(start)]
pub fn main_js() -> Result<(), JsValue> {
    #[cfg(debug_assertions)]
    console_error_panic_hook::set_once();

    browser::spawn_local(async move {
        match GameLoop::start(PlatformGame::new()).await {
            Ok(_handle) => log!("Game loop started"),
            Err(err) => error!("Could not start the game {:#?}", err),
        }
    });

    Ok(())
}
