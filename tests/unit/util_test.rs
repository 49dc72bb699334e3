//! Tests for utility functions

use container_dispatch::util::{elapsed_ms, init_tracing, now_ms};

#[test]
fn test_clock_moves_forward() {
    let a = now_ms();
    std::thread::sleep(std::time::Duration::from_millis(5));
    let b = now_ms();
    assert!(elapsed_ms(a, b) >= 5);
}

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing();
    init_tracing();
    tracing::info!("tracing initialized twice without panicking");
}
