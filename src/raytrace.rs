//! Integer-grid line walking (Amanatides-Woo style), used by the sensor
//! model to find which cells a beam passes through.

use nalgebra::Vector2;

use crate::utility::Point;

/// Walks every unit cell the segment `from -> to` enters, in order, calling
/// `visit(cx, cy, remaining)` for each one, where `remaining` is the number
/// of cells still to be visited after this one. Returning `true` from
/// `visit` stops the walk early (the visitor has seen enough).
///
/// A zero-length segment still visits its single starting cell once.
pub fn trace<F>(from: Point, to: Point, mut visit: F)
where
    F: FnMut(i32, i32, u32) -> bool,
{
    let delta = Vector2::new(to.x - from.x, to.y - from.y);
    let (mut cx, mut cy) = from.cell();
    let (end_x, end_y) = to.cell();

    if delta.x == 0.0 && delta.y == 0.0 {
        visit(cx, cy, 0);
        return;
    }

    let step_x: i32 = if delta.x > 0.0 {
        1
    } else if delta.x < 0.0 {
        -1
    } else {
        0
    };
    let step_y: i32 = if delta.y > 0.0 {
        1
    } else if delta.y < 0.0 {
        -1
    } else {
        0
    };

    // Distance (in units of the parameter t, where t=1 spans the whole
    // segment) needed to cross one full cell along each axis.
    let t_delta_x = if delta.x != 0.0 {
        (1.0 / delta.x).abs()
    } else {
        f64::INFINITY
    };
    let t_delta_y = if delta.y != 0.0 {
        (1.0 / delta.y).abs()
    } else {
        f64::INFINITY
    };

    let next_boundary = |coord: f64, step: i32| -> f64 {
        if step > 0 {
            coord.floor() + 1.0 - coord
        } else {
            coord - coord.floor()
        }
    };

    let mut t_max_x = if delta.x != 0.0 {
        next_boundary(from.x, step_x) / delta.x.abs()
    } else {
        f64::INFINITY
    };
    let mut t_max_y = if delta.y != 0.0 {
        next_boundary(from.y, step_y) / delta.y.abs()
    } else {
        f64::INFINITY
    };

    // Total number of cell boundaries we'll cross, which bounds how many
    // cells remain to visit after the start cell.
    let steps_x = (end_x - cx).unsigned_abs();
    let steps_y = (end_y - cy).unsigned_abs();
    let mut remaining = steps_x + steps_y;

    loop {
        if visit(cx, cy, remaining) {
            return;
        }
        if remaining == 0 {
            return;
        }
        if t_max_x < t_max_y {
            t_max_x += t_delta_x;
            cx += step_x;
        } else {
            t_max_y += t_delta_y;
            cy += step_y;
        }
        remaining -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn traces_a_horizontal_run() {
        let mut visited = Vec::new();
        trace(Point::new(0.5, 0.5), Point::new(3.5, 0.5), |cx, cy, n| {
            visited.push((cx, cy, n));
            false
        });
        assert_eq!(visited, vec![(0, 0, 3), (1, 0, 2), (2, 0, 1), (3, 0, 0)]);
    }

    #[test]
    fn traces_a_vertical_run() {
        let mut visited = Vec::new();
        trace(Point::new(2.5, 0.5), Point::new(2.5, 3.5), |cx, cy, n| {
            visited.push((cx, cy, n));
            false
        });
        assert_eq!(visited, vec![(2, 0, 3), (2, 1, 2), (2, 2, 1), (2, 3, 0)]);
    }

    #[test]
    fn zero_length_segment_visits_once() {
        let mut visited = Vec::new();
        trace(Point::new(1.2, 3.4), Point::new(1.2, 3.4), |cx, cy, n| {
            visited.push((cx, cy, n));
            false
        });
        assert_eq!(visited, vec![(1, 3, 0)]);
    }

    #[test]
    fn early_termination_stops_the_walk() {
        let mut visited = Vec::new();
        trace(Point::new(0.5, 0.5), Point::new(10.5, 0.5), |cx, cy, n| {
            visited.push((cx, cy, n));
            cx == 2
        });
        assert_eq!(visited, vec![(0, 0, 9), (1, 0, 8), (2, 0, 7)]);
    }

    #[test]
    fn diagonal_run_visits_every_crossed_cell() {
        let mut visited = Vec::new();
        trace(Point::new(0.1, 0.1), Point::new(2.9, 2.9), |cx, cy, n| {
            visited.push((cx, cy, n));
            false
        });
        // Diagonal through (0,0),(1,1),(2,2) plus whatever boundary
        // crossings the DDA resolves them in; start and end cells must be
        // present and the walk must terminate with n = 0.
        assert_eq!(visited.first(), Some(&(0, 0, 4)));
        assert_eq!(visited.last().unwrap().2, 0);
        assert!(visited.iter().any(|&(x, y, _)| (x, y) == (2, 2)));
    }
}
