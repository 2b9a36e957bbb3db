use proptest::prelude::*;
use simfell_engine::stats::BASE_CRIT_PERCENT;
use simfell_engine::{Character, DerivedStats, Stat, StatCoefficients, StatPoints, Stats};

fn rime_coefficients() -> StatCoefficients {
    StatCoefficients {
        intellect: 1.0,
        crit: 0.1,
        expertise: 0.1,
        haste: 0.1,
        spirit: 0.1,
    }
}

#[test]
fn crit_includes_the_flat_base() {
    let stats = Stats::new(StatPoints::new(0, 0, 0, 0, 0), rime_coefficients());
    assert_eq!(stats.derived().crit, BASE_CRIT_PERCENT);
}

#[test]
fn character_update_recomputes_everything() {
    let mut c = Character::for_hero("rime", StatPoints::new(100, 100, 100, 100, 100)).unwrap();
    c.update_stats(200, 0, 50, 300, 10);
    let d = c.stats().derived();
    assert_eq!(d.intellect, 200.0);
    assert_eq!(d.crit, BASE_CRIT_PERCENT);
    assert!((d.expertise - 5.0).abs() < 1e-9);
    assert!((d.haste - 30.0).abs() < 1e-9);
    assert!((d.spirit - 1.0).abs() < 1e-9);
    assert_eq!(c.points(), StatPoints::new(200, 0, 50, 300, 10));
}

fn points() -> impl Strategy<Value = StatPoints> {
    (0u32..2000, 0u32..2000, 0u32..2000, 0u32..2000, 0u32..2000)
        .prop_map(|(i, c, e, h, s)| StatPoints::new(i, c, e, h, s))
}

proptest! {
    #[test]
    fn updates_match_a_fresh_derivation(first in points(), second in points()) {
        let coefficients = rime_coefficients();
        let mut stats = Stats::new(first, coefficients);
        stats.update(second);
        prop_assert_eq!(*stats.derived(), DerivedStats::derive(second, &coefficients));
        prop_assert_eq!(stats.points(), second);
    }

    #[test]
    fn gain_touches_one_stat_only(base in points(), gain in 0u32..100) {
        for stat in Stat::ALL {
            let boosted = base.with_gain(stat, gain);
            for other in Stat::ALL {
                let expected = if other == stat { base.get(other) + gain } else { base.get(other) };
                prop_assert_eq!(boosted.get(other), expected);
            }
        }
    }
}
