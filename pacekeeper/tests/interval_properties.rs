//! Property tests for the interval gate.
//!
//! Run with: `cargo test --test interval_properties`

use std::time::Duration;

use proptest::prelude::*;

use pacekeeper::events::drain;
use pacekeeper::runtime::{Replay, SessionInput};
use pacekeeper::source::SimulatedSource;
use pacekeeper::throttle::TimeIntervalPolicy;
use pacekeeper::{LocationSample, ManagerConfig};

fn speed_strategy() -> impl Strategy<Value = Option<f64>> {
    prop_oneof![
        Just(None),
        Just(Some(0.0)),
        (0.0f64..15.0).prop_map(Some),
    ]
}

fn sample(speed: Option<f64>) -> LocationSample {
    let sample = LocationSample::new(53.5511, 9.9937);
    match speed {
        Some(v) => sample.with_speed(v),
        None => sample,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Consecutive interval updates are at least the previously announced
    /// interval apart.
    #[test]
    fn interval_updates_respect_announced_spacing(
        steps in prop::collection::vec((0u64..400_000, speed_strategy()), 1..60),
        min_secs in 1u64..30,
        extra_secs in 0u64..300,
    ) {
        let config = ManagerConfig {
            min_interval: Duration::from_secs(min_secs),
            max_interval: Duration::from_secs(min_secs + extra_secs),
            ..Default::default()
        };
        let mut replay = Replay::new(SimulatedSource::authorized(), config).unwrap();
        let mut intervals = replay.manager().events().subscribe_interval_updates();
        let mut updates = replay.manager().events().subscribe_updates();

        replay.apply_at(Duration::ZERO, SessionInput::Start);

        let mut at = Duration::ZERO;
        let mut emitted: Vec<(Duration, Duration)> = Vec::new();
        for (gap_ms, speed) in &steps {
            at += Duration::from_millis(*gap_ms);
            replay.apply_at(at, SessionInput::Location(sample(*speed)));

            let new = drain(&mut intervals);
            prop_assert!(new.len() <= 1);
            emitted.extend(new.into_iter().map(|u| (at, u.interval)));
        }

        prop_assert_eq!(drain(&mut updates).len(), steps.len());
        prop_assert!(!emitted.is_empty());
        for pair in emitted.windows(2) {
            let (t0, announced) = pair[0];
            let (t1, _) = pair[1];
            prop_assert!(t1 - t0 >= announced, "{:?} then {:?} after {:?}", t0, t1, announced);
        }
    }

    /// The selected interval is always one of the two configured bounds.
    #[test]
    fn policy_selects_a_bound(speed in speed_strategy(), threshold in 0.0f64..5.0) {
        let policy = TimeIntervalPolicy::new(
            Duration::from_secs(5),
            Duration::from_secs(300),
            threshold,
        );
        let selected = policy.select(speed);
        let fast = matches!(speed, Some(v) if v >= threshold && v > 0.0);
        prop_assert_eq!(selected, if fast { policy.min } else { policy.max });
    }
}
