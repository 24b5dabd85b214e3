// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::TimeZone;

#[test]
fn system_clock_returns_increasing_time() {
    let clock = SystemClock;
    let t1 = clock.now();
    std::thread::sleep(Duration::from_millis(1));
    let t2 = clock.now();
    assert!(t2 > t1);
}

#[test]
fn fake_clock_advances_both_readings() {
    let start = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
    let clock = FakeClock::at(start);
    let t1 = clock.now();

    clock.advance(Duration::from_secs(90));

    assert!(clock.now().duration_since(t1) >= Duration::from_secs(90));
    assert_eq!(clock.utc_now(), start + chrono::Duration::seconds(90));
}

#[test]
fn fake_clock_is_cloneable_and_shared() {
    let clock1 = FakeClock::new();
    let clock2 = clock1.clone();
    let wall = clock1.utc_now();
    clock2.advance(Duration::from_secs(30));
    assert_eq!(clock1.utc_now(), wall + chrono::Duration::seconds(30));
}

#[test]
fn set_utc_moves_only_the_wall_reading() {
    let clock = FakeClock::new();
    let instant = clock.now();
    let later = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();

    clock.set_utc(later);

    assert_eq!(clock.utc_now(), later);
    assert_eq!(clock.now(), instant);
}
