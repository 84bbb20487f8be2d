//! Value model: runtime types, literal data, and stack symbols.
//!
//! `Data` is a tagged union; the tag and payload can never disagree.
//! Moving between the two numeric types goes through `Data::cast`, and
//! the raw-word view (`to_bits` / `from_bits`) exists for storage that is
//! untyped at the word level.

use std::fmt;
use std::str::FromStr;

/// Runtime type of a value on the target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    /// 32-bit signed integer word.
    I32,
    /// 32-bit IEEE single-precision float.
    F32,
    /// Null-terminated string literal. Print-only.
    Str,
}

impl Type {
    pub fn is_numeric(self) -> bool {
        matches!(self, Type::I32 | Type::F32)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::I32 => write!(f, "int"),
            Type::F32 => write!(f, "float"),
            Type::Str => write!(f, "string"),
        }
    }
}

impl FromStr for Type {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "int" | "i32" => Ok(Type::I32),
            "float" | "f32" => Ok(Type::F32),
            "string" | "str" => Ok(Type::Str),
            _ => Err(format!("unknown type '{}'", s)),
        }
    }
}

// ─── Data ─────────────────────────────────────────────────────────

/// A numeric literal.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Data {
    I32(i32),
    F32(f32),
}

impl Data {
    pub fn ty(&self) -> Type {
        match self {
            Data::I32(_) => Type::I32,
            Data::F32(_) => Type::F32,
        }
    }

    /// Explicit numeric conversion.
    ///
    /// Int to float rounds to the nearest representable value. Float to int
    /// truncates toward zero and yields `None` for NaN, infinities and
    /// values outside the `i32` range. Casting to `Str` is always `None`.
    pub fn cast(self, to: Type) -> Option<Data> {
        match (self, to) {
            (Data::I32(v), Type::I32) => Some(Data::I32(v)),
            (Data::F32(v), Type::F32) => Some(Data::F32(v)),
            (Data::I32(v), Type::F32) => Some(Data::F32(v as f32)),
            (Data::F32(v), Type::I32) => {
                if !v.is_finite() {
                    return None;
                }
                let t = v.trunc();
                // i32::MIN is exactly representable, i32::MAX is not.
                if t < i32::MIN as f32 || t >= 2_147_483_648.0 {
                    None
                } else {
                    Some(Data::I32(t as i32))
                }
            }
            (_, Type::Str) => None,
        }
    }

    /// Whether the target can encode this value as an immediate operand.
    pub fn is_encodable(&self) -> bool {
        match self {
            Data::I32(_) => true,
            Data::F32(v) => v.is_finite(),
        }
    }

    /// The value as a raw 32-bit word.
    pub fn to_bits(self) -> u32 {
        match self {
            Data::I32(v) => v as u32,
            Data::F32(v) => v.to_bits(),
        }
    }

    /// Reinterpret a raw word as a value of `ty`.
    pub fn from_bits(ty: Type, bits: u32) -> Option<Data> {
        match ty {
            Type::I32 => Some(Data::I32(bits as i32)),
            Type::F32 => Some(Data::F32(f32::from_bits(bits))),
            Type::Str => None,
        }
    }

    pub fn to_le_bytes(self) -> [u8; 4] {
        self.to_bits().to_le_bytes()
    }
}

impl fmt::Display for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Data::I32(v) => write!(f, "{}", v),
            Data::F32(v) => {
                let text = v.to_string();
                if v.is_finite() && !text.contains('.') {
                    write!(f, "{}.0", text)
                } else {
                    write!(f, "{}", text)
                }
            }
        }
    }
}

impl From<i32> for Data {
    fn from(v: i32) -> Self {
        Data::I32(v)
    }
}

impl From<f32> for Data {
    fn from(v: f32) -> Self {
        Data::F32(v)
    }
}

// ─── Symbol ───────────────────────────────────────────────────────

/// An evaluation-stack element.
#[derive(Clone, Debug, PartialEq)]
pub enum Symbol {
    /// Reference to a symbol-table entry.
    Ident(String),
    /// Numeric literal.
    Literal(Data),
    /// String literal.
    Text(String),
}

impl Symbol {
    pub fn ident(name: impl Into<String>) -> Self {
        Symbol::Ident(name.into())
    }

    pub fn text(text: impl Into<String>) -> Self {
        Symbol::Text(text.into())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Ident(name) => write!(f, "{}", name),
            Symbol::Literal(data) => write!(f, "{}", data),
            Symbol::Text(text) => write!(f, "{:?}", text),
        }
    }
}

impl From<Data> for Symbol {
    fn from(data: Data) -> Self {
        Symbol::Literal(data)
    }
}

impl From<i32> for Symbol {
    fn from(v: i32) -> Self {
        Symbol::Literal(Data::I32(v))
    }
}

impl From<f32> for Symbol {
    fn from(v: f32) -> Self {
        Symbol::Literal(Data::F32(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_literal_always_has_point() {
        assert_eq!(Data::F32(3.0).to_string(), "3.0");
        assert_eq!(Data::F32(2.5).to_string(), "2.5");
        assert_eq!(Data::F32(-0.125).to_string(), "-0.125");
        assert_eq!(Data::I32(-7).to_string(), "-7");
    }

    #[test]
    fn test_cast_int_to_float() {
        assert_eq!(Data::I32(5).cast(Type::F32), Some(Data::F32(5.0)));
        assert_eq!(Data::I32(5).cast(Type::I32), Some(Data::I32(5)));
    }

    #[test]
    fn test_cast_float_to_int_truncates() {
        assert_eq!(Data::F32(2.9).cast(Type::I32), Some(Data::I32(2)));
        assert_eq!(Data::F32(-2.9).cast(Type::I32), Some(Data::I32(-2)));
    }

    #[test]
    fn test_cast_rejects_unrepresentable() {
        assert_eq!(Data::F32(f32::NAN).cast(Type::I32), None);
        assert_eq!(Data::F32(f32::INFINITY).cast(Type::I32), None);
        assert_eq!(Data::F32(3.0e9).cast(Type::I32), None);
        assert_eq!(Data::I32(1).cast(Type::Str), None);
    }

    #[test]
    fn test_bits_keep_tag() {
        let f = Data::F32(1.5);
        assert_eq!(f.to_bits(), 0x3fc0_0000);
        assert_eq!(Data::from_bits(Type::F32, f.to_bits()), Some(f));
        assert_eq!(Data::I32(-1).to_bits(), u32::MAX);
        assert_eq!(Data::from_bits(Type::I32, u32::MAX), Some(Data::I32(-1)));
        assert_eq!(Data::from_bits(Type::Str, 0), None);
    }

    #[test]
    fn test_le_bytes() {
        let d = Data::I32(0x0102_0304);
        assert_eq!(d.to_le_bytes(), [4, 3, 2, 1]);
        assert_eq!(Data::from_bits(Type::I32, u32::from_le_bytes([4, 3, 2, 1])), Some(d));
    }

    #[test]
    fn test_encodable() {
        assert!(Data::I32(i32::MIN).is_encodable());
        assert!(Data::F32(0.1).is_encodable());
        assert!(!Data::F32(f32::NEG_INFINITY).is_encodable());
    }

    #[test]
    fn test_type_parse() {
        assert_eq!("int".parse::<Type>(), Ok(Type::I32));
        assert_eq!("float".parse::<Type>(), Ok(Type::F32));
        assert!("double".parse::<Type>().is_err());
    }
}
