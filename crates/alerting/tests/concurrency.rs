//! Concurrent writers on the same and on different alert keys

use alerting::{AlertLifecycle, AlertType, EscalationScope, LifecycleConfig, Priority};
use chrono::{Duration, TimeZone, Utc};
use std::sync::Arc;
use std::thread;

#[test]
fn simultaneous_triggers_open_exactly_one_alert() {
    let lifecycle = Arc::new(AlertLifecycle::default());
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 7, 30, 0).unwrap();

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let lifecycle = Arc::clone(&lifecycle);
            thread::spawn(move || {
                (0..50)
                    .map(|_| {
                        lifecycle
                            .create_or_update("W-1", AlertType::Ai, Priority::Emergency, "x", now)
                            .created()
                    })
                    .filter(|created| *created)
                    .count()
            })
        })
        .collect();

    let created: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(created, 1);

    let open = lifecycle.open_alert("W-1", AlertType::Ai).unwrap();
    assert_eq!(open.count, 16 * 50);
    assert_eq!(lifecycle.active().len(), 1);
}

#[test]
fn sweep_racing_with_triggers_loses_no_updates() {
    let lifecycle = Arc::new(AlertLifecycle::new(LifecycleConfig {
        cooldown_seconds: 3600,
        escalate_after_seconds: 0,
        ..LifecycleConfig::default()
    }));
    let start = Utc.with_ymd_and_hms(2024, 6, 1, 7, 30, 0).unwrap();

    let writers: Vec<_> = (0..8)
        .map(|worker| {
            let lifecycle = Arc::clone(&lifecycle);
            thread::spawn(move || {
                let worker_id = format!("W-{}", worker);
                for tick in 0..100 {
                    lifecycle.create_or_update(
                        &worker_id,
                        AlertType::Manual,
                        Priority::Emergency,
                        "sos",
                        start + Duration::milliseconds(tick),
                    );
                }
            })
        })
        .collect();

    let sweeper = {
        let lifecycle = Arc::clone(&lifecycle);
        thread::spawn(move || {
            for _ in 0..100 {
                lifecycle.escalate_overdue(start + Duration::hours(1), EscalationScope::EmergencyOnly);
            }
        })
    };

    for handle in writers {
        handle.join().unwrap();
    }
    sweeper.join().unwrap();

    let active = lifecycle.active();
    assert_eq!(active.len(), 8);
    assert!(active.iter().all(|alert| alert.count == 100));
}
