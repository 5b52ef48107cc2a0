use std::f64::consts::TAU;

use ratatui::{
    layout::Rect,
    style::Color,
    symbols::Marker,
    widgets::canvas::{Canvas, Circle, Context, Points},
};

const RADIUS: f64 = 0.95;
const FILL_RADIUS: f64 = 0.9;
const GRID_STEP: f64 = 0.025;

/// True when `(x, y)` lies in the elapsed slice of the dial: measured
/// clockwise from twelve o'clock.
pub fn in_elapsed_sector(x: f64, y: f64, completion: f64) -> bool {
    let angle = x.atan2(y);
    let angle = if angle < 0.0 { angle + TAU } else { angle };
    angle < completion.clamp(0.0, 1.0) * TAU
}

/// Sample points covering the elapsed slice.
pub fn elapsed_points(completion: f64) -> Vec<(f64, f64)> {
    let steps = (2.0 * FILL_RADIUS / GRID_STEP).ceil() as i32;
    let mut points = Vec::new();
    for i in 0..=steps {
        for j in 0..=steps {
            let x = -FILL_RADIUS + f64::from(i) * GRID_STEP;
            let y = -FILL_RADIUS + f64::from(j) * GRID_STEP;
            if x * x + y * y <= FILL_RADIUS * FILL_RADIUS && in_elapsed_sector(x, y, completion) {
                points.push((x, y));
            }
        }
    }
    points
}

/// Circular progress dial filling clockwise as the session elapses.
pub fn dial(completion: f64) -> Canvas<'static, impl Fn(&mut Context)> {
    let points = elapsed_points(completion);
    Canvas::default()
        .marker(Marker::Braille)
        .x_bounds([-1.0, 1.0])
        .y_bounds([-1.0, 1.0])
        .paint(move |ctx| {
            ctx.draw(&Circle {
                x: 0.0,
                y: 0.0,
                radius: RADIUS,
                color: Color::DarkGray,
            });
            ctx.draw(&Points {
                coords: &points,
                color: Color::White,
            });
        })
}

/// Square-looking area centered in `area`; terminal cells are about twice as
/// tall as they are wide.
pub fn dial_area(area: Rect) -> Rect {
    let height = area.height;
    let width = (height * 2).min(area.width);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y,
        width,
        height,
    }
}
