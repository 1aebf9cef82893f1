use crate::{
    browser,
    session::{GameState, GameUi, StageStats},
};
use anyhow::Result;

/// The overlay button that starts the next stage or retries this one.
pub const CONTINUE_BUTTON_ID: &str = "continue";

/// HUD text goes into `#score`, `#lives`, `#items` and `#time` when the page
/// has them; overlays go into `#ui`.
pub struct DomUi;

impl GameUi for DomUi {
    fn show_stage_start(&mut self, _stage_number: u32) -> Result<()> {
        browser::hide_ui()
    }

    fn update_game_ui(&mut self, state: &GameState) -> Result<()> {
        browser::set_text("score", &state.score.to_string())?;
        browser::set_text("lives", &hearts(state.lives))?;
        browser::set_text("items", &state.items_collected.to_string())?;
        browser::set_text("time", &format_time(state.elapsed))
    }

    fn show_game_clear(&mut self, stage_number: u32, stats: &StageStats) -> Result<()> {
        browser::draw_ui(&format!(
            "<div class=\"overlay clear\"><h1>Stage {} clear!</h1>\
             <p>Score {}</p><p>Items {}</p><p>Time {}</p>\
             <button id=\"{}\">Next stage</button></div>",
            stage_number,
            stats.score,
            stats.items_collected,
            format_time(stats.time),
            CONTINUE_BUTTON_ID
        ))
    }

    fn show_game_over(&mut self, state: &GameState) -> Result<()> {
        browser::draw_ui(&format!(
            "<div class=\"overlay game-over\"><h1>Game over</h1><p>Score {}</p>\
             <button id=\"{}\">Try again</button></div>",
            state.score, CONTINUE_BUTTON_ID
        ))
    }
}

fn hearts(lives: u32) -> String {
    "\u{2665}".repeat(lives as usize)
}

/// `m:ss`, rounded down to the second.
pub fn format_time(seconds: f32) -> String {
    let whole = seconds.max(0.0) as u32;
    format!("{}:{:02}", whole / 60, whole % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_is_minutes_and_padded_seconds() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(9.9), "0:09");
        assert_eq!(format_time(125.2), "2:05");
        assert_eq!(format_time(-3.0), "0:00");
    }

    #[test]
    fn one_heart_per_life() {
        assert_eq!(hearts(3).chars().count(), 3);
        assert_eq!(hearts(0), "");
    }
}
