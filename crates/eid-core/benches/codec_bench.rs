//! Criterion benchmarks for the eID SDK JSON codec.
//!
//! Run with:
//! ```bash
//! cargo bench --package eid-core --bench codec_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use eid_core::protocol::{decode_message, encode_command, Command};
use eid_core::{DecodedEvent, MessageKind, SessionTracker};

// ── Fixtures ──────────────────────────────────────────────────────────────────

fn commands() -> Vec<(&'static str, Command)> {
    vec![
        ("get_info", Command::GetInfo),
        ("set_pin", Command::SetPin { pin: "123456".to_string() }),
        (
            "run_auth",
            Command::RunAuth {
                tc_token_url: "https://test.governikus-eid.de/AusweisAuskunft/WebServiceRequesterServlet"
                    .to_string(),
            },
        ),
        (
            "set_access_rights",
            Command::SetAccessRights {
                chat: vec![
                    "FamilyName".to_string(),
                    "GivenNames".to_string(),
                    "DateOfBirth".to_string(),
                    "Address".to_string(),
                ],
            },
        ),
    ]
}

const MESSAGES: [(&str, &str); 3] = [
    ("enter_pin", r#"{"msg":"ENTER_PIN"}"#),
    ("auth_done", r#"{"msg":"AUTH","result":{"major":"ok"},"url":"https://service.example/result"}"#),
    (
        "reader",
        r#"{"msg":"READER","name":"NFC","attached":true,"card":{"inoperative":false,"deactivated":false,"retryCounter":3}}"#,
    ),
];

// ── Benchmarks ────────────────────────────────────────────────────────────────

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_command");
    for (name, cmd) in commands() {
        group.bench_with_input(BenchmarkId::from_parameter(name), &cmd, |b, cmd| {
            b.iter(|| encode_command(black_box(cmd)).unwrap())
        });
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_message");
    for (name, wire) in MESSAGES {
        group.bench_with_input(BenchmarkId::from_parameter(name), wire, |b, wire| {
            b.iter(|| decode_message(black_box(wire)).unwrap())
        });
    }
    group.finish();
}

fn bench_tracker(c: &mut Criterion) {
    let sequence = [
        DecodedEvent::new(MessageKind::Auth),
        DecodedEvent::new(MessageKind::AccessRights),
        DecodedEvent::new(MessageKind::EnterPin),
        DecodedEvent::auth_completed("https://service.example/result"),
    ];
    c.bench_function("session_tracker_full_attempt", |b| {
        b.iter(|| {
            let mut tracker = SessionTracker::new();
            for event in &sequence {
                black_box(tracker.apply(black_box(event)));
            }
        })
    });
}

criterion_group!(benches, bench_encode, bench_decode, bench_tracker);
criterion_main!(benches);
