use crate::anchors::Rect;
use crate::schema::AnchorSide;

/// Aspect-ratio threshold for preferring horizontal over vertical sides.
const DIRECTION_PREF_RATIO: f32 = 1.35;
/// Segments used when flattening a cubic for length and label placement.
const CUBIC_FLATTEN_STEPS: usize = 24;
const EPS: f32 = 1e-4;

pub(crate) type Point = (f32, f32);

/// Picks facing sides for two boxes. Layers stack vertically, so vertical
/// exits win unless the horizontal gap clearly dominates.
pub(crate) fn facing_sides(from: &Rect, to: &Rect) -> (AnchorSide, AnchorSide) {
    let (from_cx, from_cy) = from.center();
    let (to_cx, to_cy) = to.center();
    let dx = to_cx - from_cx;
    let dy = to_cy - from_cy;
    let y_overlap = from.y < to.bottom() && to.y < from.bottom();

    let ratio = dx.abs() / dy.abs().max(1e-3);
    let use_horizontal = ratio > DIRECTION_PREF_RATIO || (y_overlap && ratio > 0.9);

    if use_horizontal {
        if dx >= 0.0 {
            (AnchorSide::Right, AnchorSide::Left)
        } else {
            (AnchorSide::Left, AnchorSide::Right)
        }
    } else if dy >= 0.0 {
        (AnchorSide::Bottom, AnchorSide::Top)
    } else {
        (AnchorSide::Top, AnchorSide::Bottom)
    }
}

/// Side midpoint shifted along the side by `offset`, clamped to the side.
pub(crate) fn anchor_point(rect: &Rect, side: AnchorSide, offset: f32) -> Point {
    let half_extent = match side {
        AnchorSide::Left | AnchorSide::Right => rect.height / 2.0,
        AnchorSide::Top | AnchorSide::Bottom => rect.width / 2.0,
    };
    let clamped = if half_extent > 0.0 && offset.is_finite() {
        offset.clamp(-half_extent, half_extent)
    } else {
        0.0
    };
    apply_side_offset(rect.side_midpoint(side), side, clamped)
}

pub(crate) fn apply_side_offset(point: Point, side: AnchorSide, offset: f32) -> Point {
    match side {
        AnchorSide::Left | AnchorSide::Right => (point.0, point.1 + offset),
        AnchorSide::Top | AnchorSide::Bottom => (point.0 + offset, point.1),
    }
}

/// Orthogonal route leaving along the start side's axis. Returns the
/// polyline and, for Z routes, the coordinate of the crossing leg.
pub(crate) fn orthogonal_route(
    start: Point,
    start_side: AnchorSide,
    end: Point,
    end_side: AnchorSide,
    grid_break: f32,
) -> (Vec<Point>, Option<f32>) {
    let aligned_x = (start.0 - end.0).abs() <= EPS;
    let aligned_y = (start.1 - end.1).abs() <= EPS;
    if (start_side.is_vertical_exit() && aligned_x) || (!start_side.is_vertical_exit() && aligned_y)
    {
        return (vec![start, end], None);
    }

    match (start_side.is_vertical_exit(), end_side.is_vertical_exit()) {
        (true, true) => {
            let break_y = start.1 + grid_break * (end.1 - start.1);
            let points = vec![start, (start.0, break_y), (end.0, break_y), end];
            (compress_path(&points), Some(break_y))
        }
        (false, false) => {
            let break_x = start.0 + grid_break * (end.0 - start.0);
            let points = vec![start, (break_x, start.1), (break_x, end.1), end];
            (compress_path(&points), Some(break_x))
        }
        (true, false) => (compress_path(&[start, (start.0, end.1), end]), None),
        (false, true) => (compress_path(&[start, (end.0, start.1), end]), None),
    }
}

pub(crate) fn compress_path(points: &[Point]) -> Vec<Point> {
    if points.len() <= 2 {
        return points.to_vec();
    }
    let mut out: Vec<Point> = Vec::with_capacity(points.len());
    out.push(points[0]);
    for idx in 1..points.len() - 1 {
        let prev = out[out.len() - 1];
        let curr = points[idx];
        if same_point(prev, curr) {
            continue;
        }
        let next = points[idx + 1];
        let dx1 = curr.0 - prev.0;
        let dy1 = curr.1 - prev.1;
        let dx2 = next.0 - curr.0;
        let dy2 = next.1 - curr.1;
        if (dx1.abs() <= EPS && dx2.abs() <= EPS) || (dy1.abs() <= EPS && dy2.abs() <= EPS) {
            continue;
        }
        out.push(curr);
    }
    let last = points[points.len() - 1];
    if !same_point(last, out[out.len() - 1]) || out.len() == 1 {
        out.push(last);
    }
    out
}

fn same_point(a: Point, b: Point) -> bool {
    (a.0 - b.0).abs() <= EPS && (a.1 - b.1).abs() <= EPS
}

pub(crate) fn distance(a: Point, b: Point) -> f32 {
    let dx = b.0 - a.0;
    let dy = b.1 - a.1;
    (dx * dx + dy * dy).sqrt()
}

pub(crate) fn path_length(points: &[Point]) -> f32 {
    points.windows(2).map(|w| distance(w[0], w[1])).sum()
}

pub(crate) fn path_bend_count(points: &[Point]) -> usize {
    if points.len() < 3 {
        return 0;
    }
    let mut bends = 0usize;
    for idx in 1..points.len() - 1 {
        let p0 = points[idx - 1];
        let p1 = points[idx];
        let p2 = points[idx + 1];
        let dx1 = p1.0 - p0.0;
        let dy1 = p1.1 - p0.1;
        let dx2 = p2.0 - p1.0;
        let dy2 = p2.1 - p1.1;
        if (dx1.abs() <= EPS && dy1.abs() <= EPS) || (dx2.abs() <= EPS && dy2.abs() <= EPS) {
            continue;
        }
        let cross = dx1 * dy2 - dy1 * dx2;
        if cross.abs() > EPS {
            bends += 1;
        }
    }
    bends
}

/// Point at `fraction` of the polyline's total length.
pub(crate) fn point_at_fraction(points: &[Point], fraction: f32) -> Option<Point> {
    let first = *points.first()?;
    let total = path_length(points);
    if total <= EPS {
        return Some(first);
    }
    let mut remaining = total * fraction.clamp(0.0, 1.0);
    for w in points.windows(2) {
        let len = distance(w[0], w[1]);
        if remaining <= len {
            if len <= EPS {
                return Some(w[0]);
            }
            let t = remaining / len;
            return Some((w[0].0 + (w[1].0 - w[0].0) * t, w[0].1 + (w[1].1 - w[0].1) * t));
        }
        remaining -= len;
    }
    points.last().copied()
}

pub(crate) fn cubic_point(p0: Point, c1: Point, c2: Point, p3: Point, t: f32) -> Point {
    let mt = 1.0 - t;
    let a = mt * mt * mt;
    let b = 3.0 * mt * mt * t;
    let c = 3.0 * mt * t * t;
    let d = t * t * t;
    (
        a * p0.0 + b * c1.0 + c * c2.0 + d * p3.0,
        a * p0.1 + b * c1.1 + c * c2.1 + d * p3.1,
    )
}

/// Appends the flattened cubic (excluding `p0`) to `out`.
pub(crate) fn flatten_cubic(p0: Point, c1: Point, c2: Point, p3: Point, out: &mut Vec<Point>) {
    for step in 1..=CUBIC_FLATTEN_STEPS {
        let t = step as f32 / CUBIC_FLATTEN_STEPS as f32;
        out.push(cubic_point(p0, c1, c2, p3, t));
    }
}

/// Unit direction of travel into `tip`, taken from the last distinct point.
pub(crate) fn incoming_direction(points: &[Point]) -> Option<Point> {
    let tip = *points.last()?;
    let from = points.iter().rev().skip(1).find(|p| distance(**p, tip) > EPS)?;
    let len = distance(*from, tip);
    Some(((tip.0 - from.0) / len, (tip.1 - from.1) / len))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn facing_sides_prefers_vertical_for_stacked_boxes() {
        let top = Rect::new(0.0, 0.0, 100.0, 40.0);
        let below = Rect::new(60.0, 120.0, 100.0, 40.0);
        assert_eq!(facing_sides(&top, &below), (AnchorSide::Bottom, AnchorSide::Top));
        assert_eq!(facing_sides(&below, &top), (AnchorSide::Top, AnchorSide::Bottom));

        let beside = Rect::new(300.0, 0.0, 100.0, 40.0);
        assert_eq!(facing_sides(&top, &beside), (AnchorSide::Right, AnchorSide::Left));
    }

    #[test]
    fn anchor_offset_is_clamped_to_the_side() {
        let rect = Rect::new(0.0, 0.0, 100.0, 40.0);
        assert_eq!(anchor_point(&rect, AnchorSide::Bottom, 10.0), (60.0, 40.0));
        assert_eq!(anchor_point(&rect, AnchorSide::Bottom, 500.0), (100.0, 40.0));
        assert_eq!(anchor_point(&rect, AnchorSide::Left, -5.0), (0.0, 15.0));
    }

    #[test]
    fn compress_drops_collinear_and_duplicate_points() {
        let points = vec![(0.0, 0.0), (0.0, 5.0), (0.0, 10.0), (0.0, 10.0), (10.0, 10.0)];
        assert_eq!(compress_path(&points), vec![(0.0, 0.0), (0.0, 10.0), (10.0, 10.0)]);
    }

    #[test]
    fn perpendicular_sides_give_an_l() {
        let (points, break_at) =
            orthogonal_route((0.0, 0.0), AnchorSide::Bottom, (50.0, 80.0), AnchorSide::Left, 0.5);
        assert_eq!(points, vec![(0.0, 0.0), (0.0, 80.0), (50.0, 80.0)]);
        assert_eq!(path_bend_count(&points), 1);
        assert_eq!(break_at, None);
    }

    #[test]
    fn side_by_side_sides_give_a_horizontal_z() {
        let start = (100.0, 20.0);
        let end = (300.0, 60.0);
        let (points, break_at) =
            orthogonal_route(start, AnchorSide::Right, end, AnchorSide::Left, 0.25);
        let break_x = start.0 + 0.25 * (end.0 - start.0);
        assert_eq!(break_at, Some(break_x));
        assert_eq!(points, vec![start, (break_x, start.1), (break_x, end.1), end]);
        let vertical_legs = points
            .windows(2)
            .filter(|leg| leg[0].0 == leg[1].0 && leg[0].1 != leg[1].1)
            .count();
        assert_eq!(vertical_legs, 1);
        assert_eq!(path_bend_count(&points), 2);
    }

    #[test]
    fn fraction_walks_the_polyline() {
        let points = vec![(0.0, 0.0), (0.0, 10.0), (10.0, 10.0)];
        assert_eq!(point_at_fraction(&points, 0.5), Some((0.0, 10.0)));
        assert_eq!(point_at_fraction(&points, 0.75), Some((5.0, 10.0)));
        assert_eq!(point_at_fraction(&points, 1.0), Some((10.0, 10.0)));
        assert_eq!(point_at_fraction(&[], 0.5), None);
    }

    #[test]
    fn incoming_direction_skips_repeated_tip() {
        let points = vec![(0.0, 0.0), (0.0, 10.0), (0.0, 10.0)];
        assert_eq!(incoming_direction(&points), Some((0.0, 1.0)));
    }
}
