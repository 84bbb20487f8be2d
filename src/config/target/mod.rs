use std::path::Path;
use std::str::FromStr;

use crate::diagnostic::Diagnostic;
use crate::ir::Reg;
use crate::span::Span;
use crate::value::Type;

/// What `assign` and `read` do when the identifier already exists.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RedeclarePolicy {
    /// Reuse the existing slot; the value is converted to the recorded type.
    #[default]
    Overwrite,
    /// Fail with `DuplicateDeclaration`.
    Reject,
}

impl FromStr for RedeclarePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "overwrite" => Ok(Self::Overwrite),
            "reject" => Ok(Self::Reject),
            other => Err(format!(
                "unknown redeclare policy '{}' (expected 'overwrite' or 'reject')",
                other
            )),
        }
    }
}

/// Concrete register names for each register role.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegisterNames {
    /// Integer scratch register for the left operand and the result.
    pub lhs: String,
    /// Integer scratch register for the right operand.
    pub rhs: String,
    /// Float scratch register for the left operand and the result.
    pub float_lhs: String,
    /// Float scratch register for the right operand.
    pub float_rhs: String,
    /// Service selector; also receives integer service results.
    pub selector: String,
    /// Integer and address argument for services.
    pub int_arg: String,
    /// Float argument for services.
    pub float_arg: String,
    /// Float service result.
    pub float_result: String,
}

impl RegisterNames {
    pub fn name(&self, reg: Reg) -> &str {
        match reg {
            Reg::Lhs => &self.lhs,
            Reg::Rhs => &self.rhs,
            Reg::FloatLhs => &self.float_lhs,
            Reg::FloatRhs => &self.float_rhs,
            Reg::Selector => &self.selector,
            Reg::IntArg => &self.int_arg,
            Reg::FloatArg => &self.float_arg,
            Reg::FloatResult => &self.float_result,
        }
    }
}

/// Service-trap selector codes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Services {
    pub print_int: i32,
    pub print_float: i32,
    /// `None` disables string printing.
    pub print_string: Option<i32>,
    pub read_int: i32,
    pub read_float: i32,
}

impl Services {
    /// Print selector for a value of type `ty`.
    pub fn print(&self, ty: Type) -> Option<i32> {
        match ty {
            Type::I32 => Some(self.print_int),
            Type::F32 => Some(self.print_float),
            Type::Str => self.print_string,
        }
    }

    /// Read selector for a value of type `ty`.
    pub fn read(&self, ty: Type) -> Option<i32> {
        match ty {
            Type::I32 => Some(self.read_int),
            Type::F32 => Some(self.read_float),
            Type::Str => None,
        }
    }
}

/// Target configuration: everything the lowering and the artifact layout
/// would otherwise hardcode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetConfig {
    /// Short identifier (e.g. "mips").
    pub name: String,
    /// Human-readable name.
    pub display_name: String,
    pub registers: RegisterNames,
    pub services: Services,
    /// Header line of the declarations section.
    pub data_header: String,
    /// Header line of the instructions section.
    pub text_header: String,
    /// Prefix of every declaration and instruction line.
    pub indent: String,
    /// Prefix of generated temporary names.
    pub temp_prefix: String,
    /// Prefix of string-pool labels.
    pub string_prefix: String,
    pub redeclare: RedeclarePolicy,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self::mips()
    }
}

impl TargetConfig {
    /// Built-in MIPS32 configuration (MARS/SPIM conventions).
    pub fn mips() -> Self {
        Self {
            name: "mips".to_string(),
            display_name: "MIPS32 (MARS/SPIM)".to_string(),
            registers: RegisterNames {
                lhs: "$t0".to_string(),
                rhs: "$t1".to_string(),
                float_lhs: "$f4".to_string(),
                float_rhs: "$f6".to_string(),
                selector: "$v0".to_string(),
                int_arg: "$a0".to_string(),
                float_arg: "$f12".to_string(),
                float_result: "$f0".to_string(),
            },
            services: Services {
                print_int: 1,
                print_float: 2,
                print_string: Some(4),
                read_int: 5,
                read_float: 6,
            },
            data_header: ".data".to_string(),
            text_header: ".text".to_string(),
            indent: "    ".to_string(),
            temp_prefix: "temp_".to_string(),
            string_prefix: "str_".to_string(),
            redeclare: RedeclarePolicy::Overwrite,
        }
    }

    pub fn with_redeclare(mut self, policy: RedeclarePolicy) -> Self {
        self.redeclare = policy;
        self
    }

    /// Load a target configuration from a TOML file.
    ///
    /// Keys not present in the file keep their `mips()` defaults.
    pub fn load(path: &Path) -> Result<Self, Diagnostic> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Diagnostic::error(
                format!("cannot read target config '{}': {}", path.display(), e),
                Span::dummy(),
            )
        })?;
        Self::parse_toml(&content, path)
    }

    pub(crate) fn parse_toml(content: &str, path: &Path) -> Result<Self, Diagnostic> {
        let err =
            |msg: String| Diagnostic::error(format!("{}: {}", path.display(), msg), Span::dummy());

        let mut config = Self::mips();
        let mut section = String::new();

        for (index, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            if trimmed.starts_with('[') && trimmed.ends_with(']') {
                section = trimmed[1..trimmed.len() - 1].trim().to_string();
                continue;
            }
            let Some((key, value)) = trimmed.split_once('=') else {
                return Err(err(format!(
                    "line {}: expected `key = value`, found '{}'",
                    index + 1,
                    trimmed
                )));
            };
            let key = key.trim();
            let value = parse_value(value.trim());

            let int = |field: &str| -> Result<i32, Diagnostic> {
                value
                    .parse()
                    .map_err(|_| err(format!("invalid {}.{}: {}", section, field, value)))
            };

            match (section.as_str(), key) {
                ("target", "name") => config.name = value.clone(),
                ("target", "display_name") => config.display_name = value.clone(),
                ("sections", "data") => config.data_header = value.clone(),
                ("sections", "text") => config.text_header = value.clone(),
                ("sections", "indent") => config.indent = value.clone(),
                ("registers", "lhs") => config.registers.lhs = value.clone(),
                ("registers", "rhs") => config.registers.rhs = value.clone(),
                ("registers", "float_lhs") => config.registers.float_lhs = value.clone(),
                ("registers", "float_rhs") => config.registers.float_rhs = value.clone(),
                ("registers", "selector") => config.registers.selector = value.clone(),
                ("registers", "int_arg") => config.registers.int_arg = value.clone(),
                ("registers", "float_arg") => config.registers.float_arg = value.clone(),
                ("registers", "float_result") => config.registers.float_result = value.clone(),
                ("services", "print_int") => config.services.print_int = int(key)?,
                ("services", "print_float") => config.services.print_float = int(key)?,
                ("services", "print_string") => {
                    config.services.print_string = if value == "none" {
                        None
                    } else {
                        Some(int(key)?)
                    };
                }
                ("services", "read_int") => config.services.read_int = int(key)?,
                ("services", "read_float") => config.services.read_float = int(key)?,
                ("naming", "temp_prefix") => config.temp_prefix = value.clone(),
                ("naming", "string_prefix") => config.string_prefix = value.clone(),
                ("policy", "redeclare") => {
                    config.redeclare = value.parse().map_err(err)?;
                }
                _ => {
                    return Err(err(format!("unknown key '{}' in [{}]", key, section)));
                }
            }
        }

        config.validate().map_err(err)?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("target.name must not be empty".to_string());
        }
        let regs = &self.registers;
        for (field, reg) in [
            ("lhs", &regs.lhs),
            ("rhs", &regs.rhs),
            ("float_lhs", &regs.float_lhs),
            ("float_rhs", &regs.float_rhs),
            ("selector", &regs.selector),
            ("int_arg", &regs.int_arg),
            ("float_arg", &regs.float_arg),
            ("float_result", &regs.float_result),
        ] {
            if !reg.starts_with('$') || reg.len() < 2 {
                return Err(format!("registers.{} must be a register name like '$t0'", field));
            }
        }
        if regs.lhs == regs.rhs || regs.float_lhs == regs.float_rhs {
            return Err("lhs and rhs scratch registers must differ".to_string());
        }
        for (field, prefix) in [
            ("temp_prefix", &self.temp_prefix),
            ("string_prefix", &self.string_prefix),
        ] {
            let valid = prefix
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
                && prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
            if !valid {
                return Err(format!("naming.{} must be a valid identifier prefix", field));
            }
        }
        if self.temp_prefix == self.string_prefix {
            return Err("naming.temp_prefix and naming.string_prefix must differ".to_string());
        }
        Ok(())
    }
}

/// Strip quotes (with `\t` and `\"` escapes) or a trailing comment.
fn parse_value(raw: &str) -> String {
    if let Some(rest) = raw.strip_prefix('"') {
        let mut out = String::new();
        let mut chars = rest.chars();
        while let Some(c) = chars.next() {
            match c {
                '"' => break,
                '\\' => match chars.next() {
                    Some('t') => out.push('\t'),
                    Some('n') => out.push('\n'),
                    Some(other) => out.push(other),
                    None => break,
                },
                c => out.push(c),
            }
        }
        return out;
    }
    match raw.split_once('#') {
        Some((value, _)) => value.trim().to_string(),
        None => raw.to_string(),
    }
}

#[cfg(test)]
mod tests;
