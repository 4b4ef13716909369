use super::*;

#[test]
fn virtual_clock_advances_by_whole_ticks() {
    let mut c = VirtualClock::new(Fps::new(30).unwrap());
    assert_eq!(c.now_ms(), 0.0);
    for _ in 0..30 {
        c.advance();
    }
    assert_eq!(c.ticks(), 30);
    assert_eq!(c.now_ms(), 1000.0);
    c.seek(15);
    assert_eq!(c.now_ms(), 500.0);
}

#[test]
fn system_clock_is_monotonic() {
    let c = SystemClock::new();
    let a = c.now_ms();
    let b = c.now_ms();
    assert!(b >= a);
    assert!(a >= 0.0);
}
