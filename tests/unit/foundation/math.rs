use super::*;

#[test]
fn fnv_seeded_hash_is_stable() {
    let mut a = Fnv1a64::new_default();
    a.write_bytes(b"chalkboard");
    let mut b = Fnv1a64::new(Fnv1a64::OFFSET_BASIS);
    b.write_u8(b'c');
    b.write_bytes(b"halkboard");
    assert_eq!(a.finish(), b.finish());
}

#[test]
fn fnv_distinguishes_str_boundaries() {
    let mut a = Fnv1a64::new_default();
    a.write_str("ab");
    a.write_str("c");
    let mut b = Fnv1a64::new_default();
    b.write_str("a");
    b.write_str("bc");
    assert_ne!(a.finish(), b.finish());
}

#[test]
fn mul_div255_rounds() {
    assert_eq!(mul_div255(255, 255), 255);
    assert_eq!(mul_div255(128, 255), 128);
    assert_eq!(mul_div255(0, 200), 0);
}

#[test]
fn lerp_and_quad_hit_endpoints() {
    let a = Point::new(0.0, 0.0);
    let b = Point::new(10.0, 0.0);
    let c = Point::new(5.0, 10.0);
    assert_eq!(lerp_point(a, b, 0.5), Point::new(5.0, 0.0));
    assert_eq!(quad_point(a, c, b, 0.0), a);
    assert_eq!(quad_point(a, c, b, 1.0), b);
    let mid = quad_point(a, c, b, 0.5);
    assert!((mid.x - 5.0).abs() < 1e-9);
    assert!((mid.y - 5.0).abs() < 1e-9);
}
