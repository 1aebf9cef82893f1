use crate::engine::Point;

/// Fraction of the remaining distance closed each frame.
const FOLLOW_BLEND: f32 = 0.1;
/// Game time during which the camera jumps straight to its target.
const SNAP_WINDOW: f32 = 0.1;
const VERTICAL_ANCHOR: f32 = 0.7;
const MIN_Y: f32 = -200.0;
const MAX_Y: f32 = 200.0;

pub struct Camera {
    position: Point,
    viewport_width: f32,
    viewport_height: f32,
}

impl Camera {
    pub fn new(viewport_width: f32, viewport_height: f32) -> Self {
        Camera {
            position: Point::default(),
            viewport_width,
            viewport_height,
        }
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn viewport(&self) -> (f32, f32) {
        (self.viewport_width, self.viewport_height)
    }

    /// Follows `target` (the player's top-left). The blend is applied once
    /// per call, so the follow speed is tied to the frame rate.
    pub fn update(&mut self, target: Point, stage_width: f32, elapsed: f32) {
        let goal = Point {
            x: target.x - self.viewport_width / 2.0,
            y: target.y - self.viewport_height * VERTICAL_ANCHOR,
        };

        if elapsed < SNAP_WINDOW {
            self.position = goal;
        } else {
            self.position.x += (goal.x - self.position.x) * FOLLOW_BLEND;
            self.position.y += (goal.y - self.position.y) * FOLLOW_BLEND;
        }

        let max_x = (stage_width - self.viewport_width).max(0.0);
        self.position.x = self.position.x.clamp(0.0, max_x);
        self.position.y = self.position.y.clamp(MIN_Y, MAX_Y);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snaps_to_target_at_stage_start() {
        let mut camera = Camera::new(800.0, 600.0);

        camera.update(Point { x: 1000.0, y: 448.0 }, 2400.0, 0.0);

        assert_eq!(camera.position(), Point { x: 600.0, y: 28.0 });
    }

    #[test]
    fn eases_towards_target_afterwards() {
        let mut camera = Camera::new(800.0, 600.0);
        camera.update(Point { x: 1000.0, y: 448.0 }, 2400.0, 0.0);

        camera.update(Point { x: 1100.0, y: 448.0 }, 2400.0, 0.5);

        assert!((camera.position().x - 610.0).abs() < 1e-3);
        assert!((camera.position().y - 28.0).abs() < 1e-3);
    }

    #[test]
    fn clamps_to_the_stage_horizontally() {
        let mut camera = Camera::new(800.0, 600.0);

        camera.update(Point { x: 50.0, y: 448.0 }, 2400.0, 0.0);
        assert_eq!(camera.position().x, 0.0);

        camera.update(Point { x: 2390.0, y: 448.0 }, 2400.0, 0.0);
        assert_eq!(camera.position().x, 1600.0);
    }

    #[test]
    fn narrow_stage_pins_camera_to_zero() {
        let mut camera = Camera::new(800.0, 600.0);

        camera.update(Point { x: 500.0, y: 448.0 }, 500.0, 0.0);

        assert_eq!(camera.position().x, 0.0);
    }

    #[test]
    fn vertical_position_stays_in_band() {
        let mut camera = Camera::new(800.0, 600.0);

        camera.update(Point { x: 500.0, y: 2000.0 }, 2400.0, 0.0);
        assert_eq!(camera.position().y, 200.0);

        camera.update(Point { x: 500.0, y: -2000.0 }, 2400.0, 0.0);
        assert_eq!(camera.position().y, -200.0);
    }
}
