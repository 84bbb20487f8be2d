use super::*;

#[test]
fn test_mips_defaults() {
    let config = TargetConfig::mips();
    assert_eq!(config.name, "mips");
    assert_eq!(config.registers.lhs, "$t0");
    assert_eq!(config.registers.rhs, "$t1");
    assert_eq!(config.registers.float_arg, "$f12");
    assert_eq!(config.services.print(Type::I32), Some(1));
    assert_eq!(config.services.print(Type::F32), Some(2));
    assert_eq!(config.services.print(Type::Str), Some(4));
    assert_eq!(config.services.read(Type::I32), Some(5));
    assert_eq!(config.services.read(Type::F32), Some(6));
    assert_eq!(config.services.read(Type::Str), None);
    assert_eq!(config.data_header, ".data");
    assert_eq!(config.text_header, ".text");
    assert_eq!(config.redeclare, RedeclarePolicy::Overwrite);
    assert_eq!(config, TargetConfig::default());
}

#[test]
fn test_register_roles() {
    let regs = TargetConfig::mips().registers;
    assert_eq!(regs.name(Reg::Lhs), "$t0");
    assert_eq!(regs.name(Reg::FloatRhs), "$f6");
    assert_eq!(regs.name(Reg::Selector), "$v0");
    assert_eq!(regs.name(Reg::FloatResult), "$f0");
}

#[test]
fn test_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("spim.toml");
    std::fs::write(
        &path,
        r#"
# SPIM flavour with tab indentation
[target]
name = "spim"
display_name = "SPIM"

[sections]
indent = "\t\t"

[registers]
lhs = "$t2"
rhs = "$t3"

[services]
print_string = none

[naming]
temp_prefix = "_tmp"

[policy]
redeclare = "reject"
"#,
    )
    .unwrap();

    let config = TargetConfig::load(&path).unwrap();
    assert_eq!(config.name, "spim");
    assert_eq!(config.display_name, "SPIM");
    assert_eq!(config.indent, "\t\t");
    assert_eq!(config.registers.lhs, "$t2");
    assert_eq!(config.registers.rhs, "$t3");
    assert_eq!(config.registers.float_lhs, "$f4");
    assert_eq!(config.services.print_string, None);
    assert_eq!(config.services.print_int, 1);
    assert_eq!(config.temp_prefix, "_tmp");
    assert_eq!(config.redeclare, RedeclarePolicy::Reject);
}

#[test]
fn test_trailing_comment_on_bare_value() {
    let config =
        TargetConfig::parse_toml("[services]\nprint_int = 7 # custom\n", Path::new("t.toml"))
            .unwrap();
    assert_eq!(config.services.print_int, 7);
}

#[test]
fn test_load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = TargetConfig::load(&dir.path().join("nope.toml")).unwrap_err();
    assert!(err.message.contains("cannot read target config"));
}

#[test]
fn test_unknown_key_rejected() {
    let err = TargetConfig::parse_toml("[registers]\nacc = \"$t9\"\n", Path::new("bad.toml"))
        .unwrap_err();
    assert!(err.message.contains("unknown key 'acc'"), "{}", err.message);
    assert!(err.message.starts_with("bad.toml"));
}

#[test]
fn test_invalid_selector_rejected() {
    let err = TargetConfig::parse_toml("[services]\nprint_int = one\n", Path::new("bad.toml"))
        .unwrap_err();
    assert!(err.message.contains("invalid services.print_int"));
}

#[test]
fn test_invalid_policy_rejected() {
    let err = TargetConfig::parse_toml("[policy]\nredeclare = \"shadow\"\n", Path::new("p.toml"))
        .unwrap_err();
    assert!(err.message.contains("unknown redeclare policy"));
}

#[test]
fn test_validation() {
    let same = "[registers]\nlhs = \"$t1\"\n";
    assert!(TargetConfig::parse_toml(same, Path::new("x.toml")).is_err());

    let bare = "[registers]\nselector = \"v0\"\n";
    assert!(TargetConfig::parse_toml(bare, Path::new("x.toml")).is_err());

    let prefix = "[naming]\ntemp_prefix = \"1tmp\"\n";
    assert!(TargetConfig::parse_toml(prefix, Path::new("x.toml")).is_err());

    let clash = "[naming]\nstring_prefix = \"temp_\"\n";
    assert!(TargetConfig::parse_toml(clash, Path::new("x.toml")).is_err());
}

#[test]
fn test_missing_equals_rejected() {
    let err = TargetConfig::parse_toml("[target]\nname\n", Path::new("x.toml")).unwrap_err();
    assert!(err.message.contains("line 2"));
}
