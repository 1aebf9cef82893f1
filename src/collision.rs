//! Resolves a moving body against static stage geometry.
//!
//! Grounding runs in a fixed order and stops at the first surface that
//! catches the body: one-way platforms, then solid walls, then the ground
//! line. The horizontal stage clamp always runs last. Spike hit-testing is a
//! separate query and never pushes the body.

use crate::{
    engine::{Point, Rect},
    stage::{Gap, Stage},
};

/// How far above a platform top the body's feet may be and still snap onto it.
const PLATFORM_CATCH_ABOVE: f32 = 25.0;
/// How far below a platform top the feet may have sunk and still snap back up.
const PLATFORM_CATCH_BELOW: f32 = 15.0;
const PLATFORM_EDGE_INSET: f32 = 5.0;
/// Deeper than this below the ground line means the body is inside a pit.
const GROUND_SNAP_DEPTH: f32 = 24.0;
/// Vertical overlap still treated as touching, absorbs float drift on wall tops.
const WALL_CONTACT_SLOP: f32 = 0.01;
const TRIANGLE_AREA_EPSILON: f64 = 0.01;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Body {
    pub position: Point,
    pub velocity: Point,
    pub width: f32,
    pub height: f32,
    pub crouching: bool,
    pub grounded: bool,
}

impl Body {
    pub fn new(position: Point, width: f32, height: f32) -> Self {
        Body {
            position,
            velocity: Point::default(),
            width,
            height,
            crouching: false,
            grounded: false,
        }
    }

    /// Collision box. Crouching keeps the feet in place and halves the height.
    pub fn bounds(&self) -> Rect {
        if self.crouching {
            Rect::new_from_x_y(
                self.position.x,
                self.position.y + self.height / 2.0,
                self.width,
                self.height / 2.0,
            )
        } else {
            Rect::new(self.position, self.width, self.height)
        }
    }

    pub fn bottom(&self) -> f32 {
        self.position.y + self.height
    }

    fn set_bottom(&mut self, bottom: f32) {
        self.position.y = bottom - self.height;
    }
}

/// What caught the body this frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Grounding {
    Airborne,
    Platform,
    Wall,
    Ground,
}

pub fn resolve(body: &mut Body, stage: &Stage) -> Grounding {
    body.grounded = false;

    let mut grounding = land_on_platforms(body, &stage.platforms);
    if grounding == Grounding::Airborne {
        grounding = push_out_of_walls(body, &stage.walls);
    }
    if grounding == Grounding::Airborne {
        grounding = land_on_ground(body, stage);
    }
    clamp_to_stage(body, stage.width);

    grounding
}

fn land_on_platforms(body: &mut Body, platforms: &[Rect]) -> Grounding {
    if body.velocity.y < 0.0 {
        return Grounding::Airborne;
    }

    let bottom = body.bottom();
    let left = body.position.x + PLATFORM_EDGE_INSET;
    let right = body.position.x + body.width - PLATFORM_EDGE_INSET;

    let platform = platforms.iter().find(|platform| {
        bottom >= platform.y() - PLATFORM_CATCH_ABOVE
            && bottom <= platform.y() + PLATFORM_CATCH_BELOW
            && left < platform.right()
            && right > platform.x()
    });

    match platform {
        Some(platform) => {
            body.set_bottom(platform.y());
            body.velocity.y = 0.0;
            body.grounded = true;
            Grounding::Platform
        }
        None => Grounding::Airborne,
    }
}

/// Minimum-translation push out of every wall the body touches. A wall
/// counts when the boxes overlap horizontally and at least touch
/// vertically, so a body resting exactly on a wall top stays supported.
fn push_out_of_walls(body: &mut Body, walls: &[Rect]) -> Grounding {
    let mut grounding = Grounding::Airborne;

    for wall in walls {
        let bounds = body.bounds();
        let delta_x = bounds.center().x - wall.center().x;
        let delta_y = bounds.center().y - wall.center().y;
        let overlap_x = (bounds.width + wall.width) / 2.0 - delta_x.abs();
        let overlap_y = (bounds.height + wall.height) / 2.0 - delta_y.abs();

        if overlap_x <= 0.0 || overlap_y < -WALL_CONTACT_SLOP {
            continue;
        }

        if overlap_x < overlap_y {
            body.position.x += overlap_x.copysign(delta_x);
            body.velocity.x = 0.0;
        } else if delta_y < 0.0 {
            body.set_bottom(wall.y());
            body.velocity.y = 0.0;
            body.grounded = true;
            grounding = Grounding::Wall;
        } else {
            body.position.y += overlap_y;
            if body.velocity.y < 0.0 {
                body.velocity.y = 0.0;
            }
        }
    }

    grounding
}

fn land_on_ground(body: &mut Body, stage: &Stage) -> Grounding {
    let bounds = body.bounds();
    let bottom = body.bottom();

    if bottom < stage.ground_level || !stage.has_ground_under(&bounds) {
        return Grounding::Airborne;
    }

    if bottom > stage.ground_level + GROUND_SNAP_DEPTH {
        if let Some(gap) = pit_around(&bounds, &stage.gaps) {
            body.position.x = body
                .position
                .x
                .clamp(gap.left, (gap.right - body.width).max(gap.left));
            body.velocity.x = 0.0;
            return Grounding::Airborne;
        }
    }

    body.set_bottom(stage.ground_level);
    body.velocity.y = 0.0;
    body.grounded = true;
    Grounding::Ground
}

fn pit_around<'a>(bounds: &Rect, gaps: &'a [Gap]) -> Option<&'a Gap> {
    gaps.iter()
        .find(|gap| bounds.x() < gap.right && bounds.right() > gap.left)
}

fn clamp_to_stage(body: &mut Body, stage_width: f32) {
    let max_x = (stage_width - body.width).max(0.0);
    if body.position.x < 0.0 || body.position.x > max_x {
        body.position.x = body.position.x.clamp(0.0, max_x);
        body.velocity.x = 0.0;
    }
}

/// Bottom-left, apex, bottom-right of the upward triangle inscribed in `rect`.
pub fn triangle_vertices(rect: &Rect) -> [Point; 3] {
    [
        Point {
            x: rect.x(),
            y: rect.bottom(),
        },
        Point {
            x: rect.center().x,
            y: rect.y(),
        },
        Point {
            x: rect.right(),
            y: rect.bottom(),
        },
    ]
}

fn triangle_area(a: Point, b: Point, c: Point) -> f64 {
    let (ax, ay) = (f64::from(a.x), f64::from(a.y));
    let (bx, by) = (f64::from(b.x), f64::from(b.y));
    let (cx, cy) = (f64::from(c.x), f64::from(c.y));

    ((ax * (by - cy) + bx * (cy - ay) + cx * (ay - by)) / 2.0).abs()
}

/// Area-sum test: `point` is inside (edges included) when the three
/// sub-triangles it forms add up to the whole.
pub fn point_in_triangle(point: Point, triangle: &[Point; 3]) -> bool {
    let [a, b, c] = *triangle;
    let whole = triangle_area(a, b, c);
    let parts = triangle_area(point, b, c) + triangle_area(a, point, c) + triangle_area(a, b, point);

    (parts - whole).abs() < TRIANGLE_AREA_EPSILON
}

/// True when any corner of `actor` is inside the spike triangle, or any
/// triangle vertex is inside `actor`.
pub fn triangle_hit(actor: &Rect, spike: &Rect) -> bool {
    let triangle = triangle_vertices(spike);

    actor
        .corners()
        .iter()
        .any(|corner| point_in_triangle(*corner, &triangle))
        || triangle.iter().any(|vertex| actor.contains(*vertex))
}
