use proptest::prelude::*;
use simfell_engine::{
    Character, ConfigError, Simulation, SimulationConfig, Spell, SpellDef, SpellState, StatPoints,
};

fn channel(ticks: u32, duration: f64) -> SpellDef {
    SpellDef {
        cooldown: 30.0,
        damage_percent: 100.0,
        channeled: true,
        ticks,
        debuff_duration: duration,
        ..SpellDef::named("Test Channel")
    }
}

#[test]
fn fresh_spell_is_idle_and_ready() {
    let c = Character::for_hero("rime", StatPoints::new(100, 0, 0, 0, 0)).unwrap();
    let id = c.spell_by_name("Frost Bolt").unwrap();
    let bolt = c.spell(id);
    assert_eq!(bolt.state(), SpellState::Idle);
    assert_eq!(bolt.remaining_cooldown(), 0.0);
    assert!(bolt.is_ready(&c, 1));
    assert!(!bolt.is_ready(&c, 0));
}

#[test]
fn cooldown_blocks_readiness_until_elapsed() {
    let c = Character::for_hero("rime", StatPoints::default()).unwrap();
    let mut snap = c.spell(c.spell_by_name("cold_snap").unwrap()).clone();
    snap.set_cooldown();
    assert!(!snap.is_ready(&c, 1));
    snap.update_cooldown(7.5);
    assert!(!snap.is_ready(&c, 1));
    snap.update_cooldown(0.5);
    assert_eq!(snap.remaining_cooldown(), 0.0);
    assert!(snap.is_ready(&c, 1));

    snap.set_cooldown();
    snap.reset_cooldown();
    assert!(snap.is_ready(&c, 1));
}

#[test]
fn channel_without_ticks_cannot_be_learned() {
    let mut c = Character::for_hero("rime", StatPoints::default()).unwrap();
    let err = c.learn_spell(channel(0, 3.0)).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidField { field: "ticks", .. }));
    assert!(c.spell_by_name("test_channel").is_none());

    let err = c.learn_spell(channel(4, 0.0)).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidField { field: "debuff_duration", .. }));
}

#[test]
fn periodic_debuff_needs_ticks_and_duration() {
    let dot = SpellDef {
        damage_percent: 60.0,
        is_debuff: true,
        do_debuff_damage: true,
        ticks: 0,
        debuff_duration: 6.0,
        ..SpellDef::named("Test Dot")
    };
    assert!(matches!(
        dot.validate(),
        Err(ConfigError::InvalidField { field: "ticks", .. })
    ));
    let dot = SpellDef { ticks: 3, debuff_duration: 0.0, ..dot };
    assert!(matches!(
        dot.validate(),
        Err(ConfigError::InvalidField { field: "debuff_duration", .. })
    ));
    let dot = SpellDef { debuff_duration: 6.0, ..dot };
    assert!(dot.validate().is_ok());
}

#[test]
fn negative_timers_are_rejected() {
    let mut c = Character::for_hero("rime", StatPoints::default()).unwrap();
    let cases = [
        ("cooldown", SpellDef { cooldown: -1.0, ..SpellDef::named("Test Spell") }),
        ("cast_time", SpellDef { cast_time: -0.5, ..SpellDef::named("Test Spell") }),
        ("debuff_duration", SpellDef { debuff_duration: -2.0, ..SpellDef::named("Test Spell") }),
        ("cooldown", SpellDef { cooldown: f64::NAN, ..SpellDef::named("Test Spell") }),
    ];
    for (expected, def) in cases {
        match c.learn_spell(def) {
            Err(ConfigError::InvalidField { field, value }) => {
                assert_eq!(field, expected);
                assert!(value.starts_with("Test Spell: "), "{}", value);
            }
            other => panic!("expected InvalidField for {}, got {:?}", expected, other),
        }
    }
}

#[test]
fn learning_a_known_name_replaces_the_spell() {
    let mut c = Character::for_hero("rime", StatPoints::default()).unwrap();
    let before = c.spell_by_name("Frost Bolt").unwrap();
    let id = c
        .learn_spell(SpellDef { cast_time: 2.0, damage_percent: 50.0, ..SpellDef::named("Frost Bolt") })
        .unwrap();
    assert_eq!(id, before);
    assert_eq!(c.spell(id).base_cast_time, 2.0);
}

proptest! {
    #[test]
    fn cooldown_never_increases_or_goes_negative(
        cooldown in 0.0f64..120.0,
        steps in prop::collection::vec(0.0f64..5.0, 1..64),
    ) {
        let mut spell = Spell::from(SpellDef { cooldown, ..SpellDef::named("Test Spell") });
        spell.set_cooldown();
        let mut last = spell.remaining_cooldown();
        for dt in steps {
            spell.update_cooldown(dt);
            let now = spell.remaining_cooldown();
            prop_assert!(now >= 0.0);
            prop_assert!(now <= last);
            last = now;
        }
    }

    #[test]
    fn debuff_duration_never_goes_negative(
        duration in 0.0f64..30.0,
        steps in prop::collection::vec(0.0f64..5.0, 1..32),
    ) {
        let mut spell = Spell::from(SpellDef {
            is_debuff: true,
            debuff_duration: duration,
            ..SpellDef::named("Test Spell")
        });
        spell.apply_debuff(0.0);
        for dt in steps {
            spell.update_remaining_debuff_duration(dt);
            prop_assert!(spell.remaining_debuff_duration() >= 0.0);
        }
    }

    #[test]
    fn channel_delivers_exactly_its_ticks(ticks in 1u32..12, duration in 1u32..10) {
        let mut c = Character::for_hero("rime", StatPoints::new(100, 0, 0, 0, 0)).unwrap();
        c.learn_spell(channel(ticks, duration as f64)).unwrap();
        c.add_spell_to_rotation("test_channel").unwrap();
        let config = SimulationConfig::debug(duration as f64, 1);
        let result = Simulation::new(c, config).unwrap().run().unwrap();
        let delivered = result
            .trace
            .iter()
            .filter(|l| l.starts_with("[TICK][Test Channel]"))
            .count();
        prop_assert_eq!(delivered, ticks as usize);
        prop_assert!((result.total_damage - 100.0).abs() < 1e-6);
    }
}
