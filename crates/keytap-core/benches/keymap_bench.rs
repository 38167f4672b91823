//! Criterion benchmarks for key code translation.
//!
//! Translation runs once per key event on the dispatcher thread, so a lookup
//! should stay in the nanosecond range.
//!
//! Run with:
//! ```bash
//! cargo bench --package keytap-core --bench keymap_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use keytap_core::keymap::{HidKeyCode, KeyTranslator, RawKeyCode};

// ── Representative key codes ──────────────────────────────────────────────────

/// Windows VK codes for common keys, plus one unmapped value.
const BENCH_VK_CODES: &[u32] = &[
    0x41, // 'A'
    0x5A, // 'Z'
    0x0D, // VK_RETURN
    0x1B, // VK_ESCAPE
    0x08, // VK_BACK
    0x20, // VK_SPACE
    0x70, // VK_F1
    0xA0, // VK_LSHIFT
    0xA2, // VK_LCONTROL
    0x25, // VK_LEFT
    0x31, // '1'
    0xFF, // unmapped
];

/// evdev codes for the same keys.
const BENCH_EVDEV_CODES: &[u32] = &[30, 44, 28, 1, 14, 57, 59, 42, 29, 105, 2, 0x110];

/// CGKeyCodes for the same keys.
const BENCH_CG_CODES: &[u32] = &[0x00, 0x06, 0x24, 0x35, 0x33, 0x31, 0x7A, 0x38, 0x3B, 0x7B, 0x12, 0x3F];

// ── Platform stage ────────────────────────────────────────────────────────────

fn bench_platform_to_hid(c: &mut Criterion) {
    let mut group = c.benchmark_group("keymap_to_hid");

    let inputs: [(&str, fn(u32) -> RawKeyCode, &[u32]); 3] = [
        ("windows", RawKeyCode::Windows, BENCH_VK_CODES),
        ("linux", RawKeyCode::Linux, BENCH_EVDEV_CODES),
        ("macos", RawKeyCode::MacOs, BENCH_CG_CODES),
    ];

    for (platform, wrap, codes) in inputs {
        group.bench_with_input(BenchmarkId::new("batch_12", platform), codes, |b, codes| {
            b.iter(|| {
                codes
                    .iter()
                    .map(|&code| KeyTranslator::to_hid(black_box(wrap(code))))
                    .collect::<Vec<_>>()
            })
        });
    }

    group.finish();
}

// ── Naming stage ──────────────────────────────────────────────────────────────

fn bench_name_hid(c: &mut Criterion) {
    let mut group = c.benchmark_group("keymap_name");

    group.bench_function("name_hid_single", |b| {
        b.iter(|| KeyTranslator::name_hid(black_box(HidKeyCode::KeyA)))
    });

    group.bench_function("name_hid_all", |b| {
        b.iter(|| {
            HidKeyCode::ALL
                .iter()
                .map(|&hid| KeyTranslator::name_hid(black_box(hid)))
                .collect::<Vec<_>>()
        })
    });

    group.finish();
}

// ── Full translation (per-event cost) ─────────────────────────────────────────

fn bench_translate(c: &mut Criterion) {
    let mut group = c.benchmark_group("keymap_translate");

    group.bench_function("translate_escape_windows", |b| {
        b.iter(|| KeyTranslator::translate(black_box(RawKeyCode::Windows(0x1B))))
    });

    group.bench_function("translate_unmapped_linux", |b| {
        b.iter(|| KeyTranslator::translate(black_box(RawKeyCode::Linux(0x2FF))))
    });

    group.finish();
}

criterion_group!(benches, bench_platform_to_hid, bench_name_hid, bench_translate);
criterion_main!(benches);
