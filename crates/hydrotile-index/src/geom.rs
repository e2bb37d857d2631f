//! Polygon/rectangle intersection for tile queries.
//!
//! All tests are inclusive: a polygon that merely touches the query
//! box's boundary intersects it. Polygons are closed rings (first
//! vertex repeated last) in lon/lat order.

use hydrotile_common::BoundingBox;

/// Check whether a closed ring intersects a bounding box.
///
/// Three cases cover every configuration:
/// 1. a ring vertex lies inside (or on) the box,
/// 2. a box corner lies inside (or on) the ring,
/// 3. a ring edge crosses or touches a box edge.
pub fn ring_intersects_bbox(ring: &[(f64, f64)], bbox: &BoundingBox) -> bool {
    if ring.iter().any(|&(x, y)| bbox.contains(x, y)) {
        return true;
    }

    if bbox
        .corners()
        .iter()
        .any(|&(x, y)| point_in_ring(x, y, ring))
    {
        return true;
    }

    let corners = bbox.corners();
    for window in ring.windows(2) {
        let (a, b) = (window[0], window[1]);
        for i in 0..4 {
            let c = corners[i];
            let d = corners[(i + 1) % 4];
            if segments_intersect(a, b, c, d) {
                return true;
            }
        }
    }

    false
}

/// Point-in-polygon by ray casting, counting the boundary as inside.
pub fn point_in_ring(x: f64, y: f64, ring: &[(f64, f64)]) -> bool {
    for window in ring.windows(2) {
        if point_on_segment((x, y), window[0], window[1]) {
            return true;
        }
    }

    let mut inside = false;
    for window in ring.windows(2) {
        let (x1, y1) = window[0];
        let (x2, y2) = window[1];
        // Half-open rule on y avoids double-counting vertices.
        if (y1 > y) != (y2 > y) {
            let x_cross = x1 + (y - y1) / (y2 - y1) * (x2 - x1);
            if x < x_cross {
                inside = !inside;
            }
        }
    }
    inside
}

/// Signed area orientation of the triangle (a, b, c).
fn orientation(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> f64 {
    (b.0 - a.0) * (c.1 - a.1) - (b.1 - a.1) * (c.0 - a.0)
}

/// Whether p lies on the segment ab (collinear and within its extent).
fn point_on_segment(p: (f64, f64), a: (f64, f64), b: (f64, f64)) -> bool {
    if orientation(a, b, p).abs() > f64::EPSILON * 16.0 {
        return false;
    }
    p.0 >= a.0.min(b.0) && p.0 <= a.0.max(b.0) && p.1 >= a.1.min(b.1) && p.1 <= a.1.max(b.1)
}

/// Segment/segment intersection, inclusive of endpoints and collinear
/// overlap.
fn segments_intersect(a: (f64, f64), b: (f64, f64), c: (f64, f64), d: (f64, f64)) -> bool {
    let o1 = orientation(a, b, c);
    let o2 = orientation(a, b, d);
    let o3 = orientation(c, d, a);
    let o4 = orientation(c, d, b);

    if (o1 > 0.0) != (o2 > 0.0) && (o3 > 0.0) != (o4 > 0.0) && o1 != 0.0 && o2 != 0.0 {
        return true;
    }

    // Touching or collinear configurations.
    point_on_segment(c, a, b)
        || point_on_segment(d, a, b)
        || point_on_segment(a, c, d)
        || point_on_segment(b, c, d)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_ring(min_x: f64, min_y: f64) -> Vec<(f64, f64)> {
        vec![
            (min_x, min_y),
            (min_x + 1.0, min_y),
            (min_x + 1.0, min_y + 1.0),
            (min_x, min_y + 1.0),
            (min_x, min_y),
        ]
    }

    #[test]
    fn test_overlapping_ring_intersects() {
        let bbox = BoundingBox::new(0.5, 0.5, 2.0, 2.0).unwrap();
        assert!(ring_intersects_bbox(&unit_ring(0.0, 0.0), &bbox));
    }

    #[test]
    fn test_disjoint_ring_does_not_intersect() {
        let bbox = BoundingBox::new(5.0, 5.0, 6.0, 6.0).unwrap();
        assert!(!ring_intersects_bbox(&unit_ring(0.0, 0.0), &bbox));
    }

    #[test]
    fn test_edge_touching_counts_as_intersecting() {
        // Box shares exactly the x = 1 edge with the tile.
        let bbox = BoundingBox::new(1.0, 0.0, 2.0, 1.0).unwrap();
        assert!(ring_intersects_bbox(&unit_ring(0.0, 0.0), &bbox));
    }

    #[test]
    fn test_corner_touching_counts_as_intersecting() {
        // Box touches the tile only at (1, 1).
        let bbox = BoundingBox::new(1.0, 1.0, 2.0, 2.0).unwrap();
        assert!(ring_intersects_bbox(&unit_ring(0.0, 0.0), &bbox));
    }

    #[test]
    fn test_box_entirely_inside_ring() {
        let ring = vec![
            (0.0, 0.0),
            (10.0, 0.0),
            (10.0, 10.0),
            (0.0, 10.0),
            (0.0, 0.0),
        ];
        let bbox = BoundingBox::new(4.0, 4.0, 5.0, 5.0).unwrap();
        assert!(ring_intersects_bbox(&ring, &bbox));
    }

    #[test]
    fn test_ring_entirely_inside_box() {
        let bbox = BoundingBox::new(-10.0, -10.0, 10.0, 10.0).unwrap();
        assert!(ring_intersects_bbox(&unit_ring(0.0, 0.0), &bbox));
    }

    #[test]
    fn test_point_in_ring_boundary_inclusive() {
        let ring = unit_ring(0.0, 0.0);
        assert!(point_in_ring(0.5, 0.5, &ring));
        assert!(point_in_ring(0.0, 0.5, &ring));
        assert!(point_in_ring(1.0, 1.0, &ring));
        assert!(!point_in_ring(1.5, 0.5, &ring));
    }
}
