//! End-to-end scenarios for the rendering and pacing core
//!
//! These run the pure halves of the frame path — pool allocation, pixel
//! production, the animation clock, and the callback pacer — the way the
//! dispatch loop wires them together, without needing a live compositor.

use lumen::{Checkerboard, FrameClock, FramePacer, ShmPool};

const WIDTH: usize = 640;
const HEIGHT: usize = 480;

/// Scenario 1: a pool of 640*480*4 bytes and a first draw with no prior
/// frame produces the static checkerboard — no animation delta applied.
#[test]
fn test_initial_frame_is_static() {
    let size = WIDTH * HEIGHT * 4;
    let pool = ShmPool::create(size).unwrap();
    assert_eq!(pool.size(), size);

    let clock = FrameClock::new(24.0);
    let mut pixels = vec![0u32; WIDTH * HEIGHT];
    Checkerboard::fill(&mut pixels, WIDTH, HEIGHT, clock.phase());

    // Period 16, duty 8, phase offset 0.
    for x in 0..32 {
        let expected = if x % 16 < 8 {
            Checkerboard::DARK
        } else {
            Checkerboard::LIGHT
        };
        assert_eq!(pixels[x], expected, "top row mismatch at x={x}");
    }
    // Band below flips.
    assert_eq!(pixels[8 * WIDTH], Checkerboard::LIGHT);
}

/// Scenario 2: once a callback timestamp has been recorded, a follow-up at
/// +1000ms advances the phase by exactly `1000/1000 * 24 = 24` units.
#[test]
fn test_second_callback_advances_phase() {
    let mut clock = FrameClock::new(24.0);

    // First callback: no predecessor, delta skipped.
    assert_eq!(clock.tick(250), 0.0);

    let phase = clock.tick(1250);
    assert!((phase - 24.0).abs() < 1e-4, "phase was {phase}");

    let mut pixels = vec![0u32; WIDTH * HEIGHT];
    Checkerboard::fill(&mut pixels, WIDTH, HEIGHT, phase);
    // 24 % 8 == 0: the pattern lines up with the static board again.
    assert_eq!(pixels[0], Checkerboard::DARK);
}

/// The pacing invariant across a finite run: re-arms equal completed
/// callbacks plus the initial arm — never more, never fewer.
#[test]
fn test_rearm_accounting_over_a_run() {
    let mut pacer = FramePacer::new();
    let mut clock = FrameClock::new(24.0);

    // Surface creation arms once.
    pacer.arm().unwrap();

    for frame in 0..240u32 {
        // Callback delivery: complete, re-arm before drawing, then draw.
        pacer.complete().unwrap();
        pacer.arm().unwrap();
        let phase = clock.tick(1000 + frame * 16);

        let mut pixels = vec![0u32; 16 * 16];
        Checkerboard::fill(&mut pixels, 16, 16, phase);
    }

    assert_eq!(pacer.arms(), pacer.completions() + 1);
    assert!(pacer.is_armed());
}

/// The draw path writes through the pool mapping after the descriptor is
/// gone, the way the runtime does between buffer creation and submit.
#[test]
fn test_draw_through_surviving_mapping() {
    let size = WIDTH * HEIGHT * 4;
    let pool = ShmPool::create(size).unwrap();

    // Descriptor closed here; only the mapping remains.
    let mut map = pool.into_mapping();
    for (i, chunk) in map.chunks_exact_mut(4).enumerate().take(WIDTH) {
        let px = if i % 16 < 8 {
            Checkerboard::DARK
        } else {
            Checkerboard::LIGHT
        };
        chunk.copy_from_slice(&px.to_ne_bytes());
    }

    let first = u32::from_ne_bytes([map[0], map[1], map[2], map[3]]);
    assert_eq!(first, Checkerboard::DARK);
}
