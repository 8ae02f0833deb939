use std::time::Duration;

use time::{OffsetDateTime, macros::datetime};

use slotrush::schedule::{BoostMode, BoostModeConfig, Mode, Phase};

const BASE_CART: Duration = Duration::from_secs(120);
const BASE_RESERVE: Duration = Duration::from_secs(2);

fn boost_config(enable: bool) -> BoostModeConfig {
    BoostModeConfig {
        enable,
        utc_offset: "+08:00".to_string(),
        clock_skew_ms: 0,
        warm_up_start: "05:50:00".to_string(),
        warm_up_end: None,
        boost_start: "05:59:00".to_string(),
        boost_end: "06:05:00".to_string(),
        cart_interval: "5s".to_string(),
        reserve_interval: "200ms".to_string(),
        recheck_interval: "1s".to_string(),
        reorder_interval: "400ms".to_string(),
        use_balance: true,
    }
}

fn mode(enable: bool) -> Mode {
    let boost = BoostMode::new(&boost_config(enable)).expect("boost config should validate");
    Mode::new(boost, BASE_CART, BASE_RESERVE, false)
}

fn sample_instants() -> Vec<OffsetDateTime> {
    vec![
        datetime!(2026-10-19 00:00:00 +08:00),
        datetime!(2026-10-19 05:49:59 +08:00),
        datetime!(2026-10-19 05:50:00 +08:00),
        datetime!(2026-10-19 05:58:59 +08:00),
        datetime!(2026-10-19 05:59:00 +08:00),
        datetime!(2026-10-19 06:04:59 +08:00),
        datetime!(2026-10-19 06:05:00 +08:00),
        datetime!(2026-10-19 23:59:59 +08:00),
    ]
}

#[test]
fn given_boost_disabled_when_queried_then_baselines_hold_at_every_instant() {
    let mode = mode(false);
    for now in sample_instants() {
        assert_eq!(mode.cart_interval_at(now), BASE_CART, "cart at {now}");
        assert_eq!(mode.reserve_interval_at(now), BASE_RESERVE, "reserve at {now}");
        assert!(!mode.use_balance_at(now), "balance at {now}");
        assert_eq!(mode.phase_at(now), Phase::Idle);
    }
}

#[test]
fn given_warm_up_phase_when_cart_interval_queried_then_boost_cadence_applies() {
    let mode = mode(true);

    assert_eq!(
        mode.cart_interval_at(datetime!(2026-10-19 05:50:00 +08:00)),
        Duration::from_secs(5)
    );
    assert_eq!(
        mode.cart_interval_at(datetime!(2026-10-19 05:58:59 +08:00)),
        Duration::from_secs(5)
    );
    assert_eq!(
        mode.cart_interval_at(datetime!(2026-10-19 05:49:59 +08:00)),
        BASE_CART
    );
    // Warm-up ends where boost begins.
    assert_eq!(
        mode.cart_interval_at(datetime!(2026-10-19 05:59:00 +08:00)),
        BASE_CART
    );
}

#[test]
fn given_boost_phase_when_reserve_and_balance_queried_then_boosted_values_apply() {
    let mode = mode(true);
    let inside = datetime!(2026-10-19 06:00:00 +08:00);

    assert_eq!(mode.reserve_interval_at(inside), Duration::from_millis(200));
    assert!(mode.use_balance_at(inside));
    assert_eq!(mode.phase_at(inside), Phase::Boost);

    for outside in [
        datetime!(2026-10-19 05:58:59 +08:00),
        datetime!(2026-10-19 06:05:00 +08:00),
    ] {
        assert_eq!(mode.reserve_interval_at(outside), BASE_RESERVE);
        assert!(!mode.use_balance_at(outside));
    }
}

#[test]
fn recheck_and_reorder_always_come_from_boost_config() {
    for enable in [true, false] {
        let mode = mode(enable);
        for _ in sample_instants() {
            assert_eq!(mode.recheck_interval(), Duration::from_secs(1));
            assert_eq!(mode.reorder_interval(), Duration::from_millis(400));
        }
    }
}

#[test]
fn phase_tracks_window_boundaries() {
    let mode = mode(true);
    assert_eq!(
        mode.phase_at(datetime!(2026-10-19 05:00:00 +08:00)),
        Phase::Idle
    );
    assert_eq!(
        mode.phase_at(datetime!(2026-10-19 05:55:00 +08:00)),
        Phase::WarmUp
    );
    assert_eq!(
        mode.phase_at(datetime!(2026-10-19 05:59:00 +08:00)),
        Phase::Boost
    );
    assert_eq!(
        mode.phase_at(datetime!(2026-10-19 06:05:00 +08:00)),
        Phase::Idle
    );
}

#[test]
fn time_until_boost_is_none_when_boost_disabled() {
    let early = datetime!(2026-10-19 05:00:00 +08:00);
    assert_eq!(mode(false).time_until_boost_at(early), None);
    assert_eq!(
        mode(true).time_until_boost_at(early),
        Some(Duration::from_secs(59 * 60))
    );
}

#[test]
fn home_interval_defaults_to_cart_baseline() {
    assert_eq!(mode(false).home_interval(), BASE_CART);
    let custom = mode(false).with_home_interval(Duration::from_secs(30));
    assert_eq!(custom.home_interval(), Duration::from_secs(30));
}

#[test]
fn given_disabled_boost_with_default_strings_then_intervals_are_unchanged() {
    let config: slotrush::config::Config = serde_json::from_value(serde_json::json!({
        "api": {"cookie": "c"},
        "cart_interval": "2m",
        "reserve_interval": "2s",
        "boost_mode": {"enable": false}
    }))
    .expect("config should deserialize");
    let mode = config.new_mode().expect("mode should build");

    for now in sample_instants() {
        assert_eq!(mode.cart_interval_at(now), Duration::from_secs(120));
        assert_eq!(mode.reserve_interval_at(now), Duration::from_secs(2));
    }
    assert_eq!(mode.cart_interval(), Duration::from_secs(120));
    assert_eq!(mode.reserve_interval(), Duration::from_secs(2));
}
