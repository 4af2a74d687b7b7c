use shflags::{
    assignments, detect_dialect, parse, Config, DefinitionError, Dialect, FlagValue,
    HelpFormatter, InProcessGetopt, ParseError, ParseOutcome, Registry, Residual,
};

fn args(s: &[&str]) -> Vec<String> {
    s.iter().map(|s| s.to_string()).collect()
}

fn success(outcome: ParseOutcome) -> Residual {
    match outcome {
        ParseOutcome::Success(residual) => residual,
        other => panic!("Expected Success, got {:?}", other),
    }
}

const SCRIPT: &str = r#"{
    "name": "deploy",
    "version": "0.3.0",
    "flags": [
        {"name": "verbose", "short": "v", "type": "boolean", "default": false,
         "help": "log every step"},
        {"name": "target", "short": "t", "type": "string", "default": "staging",
         "required": true, "help": "where to deploy"},
        {"name": "count", "short": "c", "type": "integer", "default": 7,
         "help": "how many"},
        {"name": "dry-run", "short": "n", "type": "boolean", "default": "true",
         "help": "only print"}
    ]
}"#;

fn script(dialect: Dialect) -> (Registry, InProcessGetopt) {
    let getopt = InProcessGetopt::new(dialect);
    let registry = Config::from_json(SCRIPT)
        .unwrap()
        .build_registry(detect_dialect(&getopt))
        .unwrap();
    (registry, getopt)
}

#[test]
fn test_boolean_literal_defaults() {
    for (literal, expected) in [
        ("true", true),
        ("t", true),
        ("0", true),
        ("false", false),
        ("f", false),
        ("1", false),
    ] {
        let mut registry = Registry::new(Dialect::Enhanced);
        registry.define_boolean("flag", literal, "", None).unwrap();
        assert_eq!(registry.value("flag").unwrap().as_bool(), Some(expected));
    }
}

#[test]
fn test_long_and_negated_booleans() {
    let (mut registry, getopt) = script(Dialect::Enhanced);
    success(parse(&mut registry, &getopt, &args(&["--verbose", "--nodry-run"])).unwrap());
    assert_eq!(registry.value("verbose"), Some(&FlagValue::Boolean(true)));
    assert_eq!(registry.value("dry_run"), Some(&FlagValue::Boolean(false)));

    success(parse(&mut registry, &getopt, &args(&["--noverbose", "--dry-run"])).unwrap());
    assert_eq!(registry.value("verbose"), Some(&FlagValue::Boolean(false)));
    assert_eq!(registry.value("dry_run"), Some(&FlagValue::Boolean(true)));
}

#[test]
fn test_short_boolean_double_toggle() {
    for dialect in [Dialect::Standard, Dialect::Enhanced] {
        let (mut registry, getopt) = script(dialect);
        success(parse(&mut registry, &getopt, &args(&["-v"])).unwrap());
        assert_eq!(registry.value("verbose"), Some(&FlagValue::Boolean(true)));

        let (mut registry, getopt) = script(dialect);
        success(parse(&mut registry, &getopt, &args(&["-v", "-v"])).unwrap());
        assert_eq!(registry.value("verbose"), Some(&FlagValue::Boolean(false)));
    }
}

#[test]
fn test_duplicates_leave_registry_unchanged() {
    let (mut registry, _) = script(Dialect::Enhanced);
    let before = registry.flags().to_vec();

    let err = registry.define_string("target", "x", "", Some('x')).unwrap_err();
    assert!(matches!(err, DefinitionError::DuplicateName(_)));
    let err = registry.define_string("other", "x", "", Some('t')).unwrap_err();
    assert_eq!(err, DefinitionError::DuplicateShortName('t'));

    assert_eq!(registry.flags(), before.as_slice());
}

#[test]
fn test_unknown_long_option_aborts() {
    let (mut registry, getopt) = script(Dialect::Enhanced);
    let err = parse(&mut registry, &getopt, &args(&["--bogus", "file"])).unwrap_err();
    assert!(matches!(err, ParseError::Dialect(_)));
    assert_eq!(err.status(), 2);
}

#[test]
fn test_integer_flag_validation() {
    let mut registry = Registry::new(Dialect::Enhanced);
    registry.define_integer("count", "7", "desc", None).unwrap();
    let getopt = InProcessGetopt::new(Dialect::Enhanced);

    let err = parse(&mut registry, &getopt, &args(&["--count", "abc"])).unwrap_err();
    assert_eq!(err.to_string(), "invalid integer value (abc)");

    success(parse(&mut registry, &getopt, &args(&["--count", "42"])).unwrap());
    assert_eq!(registry.value("count").unwrap().as_i64(), Some(42));
}

#[test]
fn test_terminator_leaves_flags_untouched() {
    let (mut registry, getopt) = script(Dialect::Enhanced);
    let residual = success(parse(&mut registry, &getopt, &args(&["--", "-x", "y"])).unwrap());
    assert_eq!(residual.positionals(), args(&["-x", "y"]).as_slice());
    for flag in registry.flags() {
        assert_eq!(flag.value(), flag.default_value(), "{} changed", flag.name());
    }
}

#[test]
fn test_reset_then_redefine() {
    let (mut registry, _) = script(Dialect::Enhanced);
    registry.reset();
    registry
        .define_string("target", "prod", "", Some('t'))
        .unwrap();
    assert_eq!(registry.value("target").unwrap().as_str(), Some("prod"));
}

#[test]
fn test_enhanced_help_label() {
    let mut registry = Registry::new(Dialect::Enhanced);
    registry
        .define_string("output", "a.txt", "output file", Some('o'))
        .unwrap();
    let help = HelpFormatter::with_width(&registry, 80).render();
    assert!(help.contains("-o,"));
    assert!(help.contains("--output"));
    assert!(help.contains("('a.txt')"));
}

#[test]
fn test_help_and_version_outcomes() {
    let (mut registry, getopt) = script(Dialect::Enhanced);
    match parse(&mut registry, &getopt, &args(&["--help"])).unwrap() {
        ParseOutcome::Help(text) => {
            assert!(text.starts_with("USAGE: deploy [flags] args\n"));
            assert!(text.contains("Required flags:\n  -t,--target"));
            assert!(text.contains("--[no]dry-run"));
        }
        other => panic!("Expected Help, got {:?}", other),
    }

    let (mut registry, getopt) = script(Dialect::Enhanced);
    let outcome = parse(&mut registry, &getopt, &args(&["--version"])).unwrap();
    assert_eq!(outcome, ParseOutcome::Version("deploy 0.3.0\n".to_string()));
    assert_eq!(outcome.status().code(), 1);
}

#[test]
fn test_standard_dialect_flow() {
    let (mut registry, getopt) = script(Dialect::Standard);
    assert_eq!(registry.dialect(), Dialect::Standard);
    let residual = success(
        parse(
            &mut registry,
            &getopt,
            &args(&["-t", "prod", "-c", "-3", "app", "-v"]),
        )
        .unwrap(),
    );
    assert_eq!(registry.value("target").unwrap().as_str(), Some("prod"));
    assert_eq!(registry.value("count").unwrap().as_i64(), Some(-3));
    assert_eq!(registry.value("verbose").unwrap().as_bool(), Some(false));
    assert_eq!(residual.positionals(), args(&["app", "-v"]).as_slice());
}

#[test]
fn test_shell_output_for_script() {
    let (mut registry, getopt) = script(Dialect::Enhanced);
    let residual = success(
        parse(
            &mut registry,
            &getopt,
            &args(&["app", "--target", "prod", "-v"]),
        )
        .unwrap(),
    );
    let output = assignments(&registry, &residual, "FLAGS_").unwrap();

    assert!(output.contains("export FLAGS_verbose=\"0\"\n"));
    assert!(output.contains("export FLAGS_target=\"prod\"\n"));
    assert!(output.contains("export FLAGS_count=\"7\"\n"));
    assert!(output.contains("export FLAGS_dry_run=\"0\"\n"));
    assert!(output.contains("export FLAGS_ARGC=\"1\"\n"));
    assert!(output.ends_with("set -- app\n"));
}

#[test]
fn test_version_and_help_notices_from_config() {
    let config = Config::from_json(
        r#"{
            "name": "deploy",
            "version": "0.3.0",
            "project": "Release Tools",
            "copyright": "2024 Example Corp",
            "license": "Licensed under the Apache License, Version 2.0.",
            "contact": "release-team@example.com"
        }"#,
    )
    .unwrap();
    let getopt = InProcessGetopt::new(Dialect::Enhanced);

    let mut registry = config.build_registry(Dialect::Enhanced).unwrap();
    let outcome = parse(&mut registry, &getopt, &args(&["--version"])).unwrap();
    assert_eq!(
        outcome,
        ParseOutcome::Version(
            "deploy (Release Tools) 0.3.0\n\
             Copyright (c) 2024 Example Corp. All rights reserved.\n\
             Licensed under the Apache License, Version 2.0.\n"
                .to_string()
        )
    );

    let mut registry = config.build_registry(Dialect::Enhanced).unwrap();
    match parse(&mut registry, &getopt, &args(&["-h"])).unwrap() {
        ParseOutcome::Help(text) => {
            assert!(text.ends_with("\nContact:\n  release-team@example.com\n"))
        }
        other => panic!("Expected Help, got {:?}", other),
    }
}
