use super::*;

#[test]
fn round_half_up_is_bit_exact() {
    assert_eq!(round_half_up(2.5), 3.0);
    assert_eq!(round_half_up(2.4999), 2.0);
    assert_eq!(round_half_up(3.5), 4.0);
    assert_eq!(round_half_up(-2.5), -2.0);
}

#[test]
fn snap_round_half_up_uses_edges_not_size() {
    let r = FRect {
        x: 10.4,
        y: 0.5,
        w: 5.2,
        h: 9.9,
    };
    // Edges: 10.4 -> 10, 15.6 -> 16, 0.5 -> 1, 10.4 -> 10.
    assert_eq!(SnapRule::RoundHalfUp.snap(r), PxRect::new(10, 1, 6, 9));
    assert_eq!(SnapRule::Outward.snap(r), PxRect::new(10, 0, 6, 11));
}

#[test]
fn contains_within_honors_tolerance() {
    let outer = PxRect::new(10, 10, 100, 20);
    assert!(outer.contains_within(PxRect::new(10, 10, 100, 20), 0));
    assert!(!outer.contains_within(PxRect::new(9, 10, 100, 20), 0));
    assert!(outer.contains_within(PxRect::new(9, 10, 102, 20), 1));
}

#[test]
fn edge_deviation_is_max_over_edges() {
    let a = PxRect::new(0, 0, 10, 10);
    let b = PxRect::new(1, 0, 10, 12);
    assert_eq!(a.max_edge_deviation(b), 2);
}

#[test]
fn to_px_clamps() {
    assert_eq!(to_px(-3.0), 0);
    assert_eq!(to_px(f64::NAN), 0);
    assert_eq!(to_px(7.0), 7);
}

#[test]
fn intersects_ignores_touching_edges() {
    let a = PxRect::new(10, 10, 20, 20);
    assert!(a.intersects(PxRect::new(29, 29, 5, 5)));
    assert!(!a.intersects(PxRect::new(30, 10, 5, 5)));
    assert!(!a.intersects(PxRect::new(10, 30, 5, 5)));
}
