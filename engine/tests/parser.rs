use simfell_engine::apl::{parse_document, ConditionSyntax};
use simfell_engine::{ConfigError, Literal, Operator};

const DOC: &str = "\
# Rime single target
name = Frosty
hero = Rime
intellect = 120
crit = 80
expertise = 40
haste = 90
spirit = 30
talents = 2-12-3
trinket1 = Frozen Heart
trinket2 =
duration = 90
enemies = 1
action=/frost_bolt,if=character.haste > 20
actions+=/cold_snap/ice_comet,if=character.winter_orbs >= 3 and spell.remaining_cooldown == 0
";

fn with_line(line: &str) -> String {
    format!("{DOC}{line}\n")
}

#[test]
fn full_document_parses() {
    let cfg = parse_document(DOC).unwrap();
    assert_eq!(cfg.name, "Frosty");
    assert_eq!(cfg.hero, "Rime");
    assert_eq!(
        (cfg.intellect, cfg.crit, cfg.expertise, cfg.haste, cfg.spirit),
        (120, 80, 40, 90, 30)
    );
    assert_eq!(cfg.talents, "2-12-3");
    assert_eq!(cfg.trinket1, "Frozen Heart");
    assert_eq!(cfg.trinket2, "");
    assert_eq!((cfg.duration, cfg.enemies), (90, 1));

    let names: Vec<_> = cfg.actions.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, ["frost_bolt", "cold_snap", "ice_comet"]);

    let first = &cfg.actions[0].conditions[0];
    assert_eq!(first.left, "character.haste");
    assert_eq!(first.operator, Operator::Gt);
    assert_eq!(first.right, Literal::Number(20.0));
    assert!(cfg.actions[1].conditions.is_empty());
    assert_eq!(cfg.actions[2].conditions.len(), 2);
}

#[test]
fn actions_display_compactly() {
    let cfg = parse_document(DOC).unwrap();
    let rendered: Vec<String> = cfg.actions.iter().map(|a| a.to_string()).collect();
    insta::assert_snapshot!(rendered.join("\n"), @r"
    frost_bolt [character.haste > 20]
    cold_snap
    ice_comet [character.winter_orbs >= 3 and spell.remaining_cooldown == 0]
    ");
}

#[test]
fn duplicate_keys_keep_the_last_value() {
    let cfg = parse_document(&with_line("haste = 10")).unwrap();
    assert_eq!(cfg.haste, 10);
}

#[test]
fn parsed_json_has_every_field() {
    let cfg = parse_document(DOC).unwrap();
    let json: serde_json::Value = serde_json::from_str(&cfg.parsed_json().unwrap()).unwrap();
    assert_eq!(json["name"], "Frosty");
    assert_eq!(json["actions"][0]["conditions"][0]["operator"], ">");
    assert_eq!(json["actions"].as_array().unwrap().len(), 3);
}

#[test]
fn line_without_equals_is_rejected() {
    let err = parse_document(&with_line("frost_bolt")).unwrap_err();
    assert!(matches!(err, ConfigError::MissingEquals { line_no: 16, .. }), "{err}");
}

#[test]
fn unknown_field_is_rejected() {
    let err = parse_document(&with_line("mastery = 4")).unwrap_err();
    assert!(matches!(err, ConfigError::UnknownField { ref field, .. } if field == "mastery"));
}

#[test]
fn negative_points_are_rejected() {
    let err = parse_document(&DOC.replace("crit = 80", "crit = -5")).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::NegativePoints {
            stat: "crit",
            value: -5
        }
    ));
}

#[test]
fn missing_required_field_is_rejected() {
    let err = parse_document(&DOC.replace("hero = Rime\n", "")).unwrap_err();
    assert!(matches!(err, ConfigError::MissingField { field: "hero" }));
}

#[test]
fn document_without_actions_is_rejected() {
    let doc: String = DOC.lines().filter(|l| !l.starts_with("action")).map(|l| format!("{l}\n")).collect();
    let err = parse_document(&doc).unwrap_err();
    assert!(matches!(err, ConfigError::MissingField { field: "actions" }));
}

#[test]
fn bad_condition_reports_its_line() {
    let err = parse_document(&with_line("actions+=/frost_bolt,if=character.haste 20")).unwrap_err();
    match err {
        ConfigError::Condition { line_no, source } => {
            assert_eq!(line_no, 16);
            assert!(matches!(source, ConditionSyntax::MissingOperator(_)));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn zero_duration_is_invalid() {
    let err = parse_document(&DOC.replace("duration = 90", "duration = 0")).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidField { field: "duration", .. }));
}

#[test]
fn missing_file_is_an_io_error() {
    let err = simfell_engine::apl::parse_path("no/such/file.simfell").unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}
