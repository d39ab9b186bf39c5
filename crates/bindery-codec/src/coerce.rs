//! Scalar coercion of textual parameter values.
//!
//! Query, header, cookie and path values arrive as text. This module turns
//! one such value into a typed scalar:
//!
//! | Kind | Accepted input |
//! |------|----------------|
//! | `bool` | `1 t T TRUE true True` / `0 f F FALSE false False` |
//! | signed integers | optional sign, base prefix `0x` / `0o` / `0b` or a leading `0` for octal, `_` between digits, range-checked |
//! | unsigned integers | as signed, without a sign |
//! | `f32`, `f64` | decimal or exponent notation, `inf`, `NaN`; overflow is out of range |
//! | `String` | taken as-is |
//!
//! # Example
//!
//! ```rust
//! use bindery_codec::coerce::{coerce, Scalar, ScalarKind};
//!
//! assert_eq!(coerce("0x1F", ScalarKind::U8).unwrap(), Scalar::U8(31));
//! assert_eq!(coerce("T", ScalarKind::Bool).unwrap(), Scalar::Bool(true));
//!
//! let err = coerce("300", ScalarKind::I8).unwrap_err();
//! assert_eq!(err.to_string(), "parsing '300' as i8: number out of range for i8");
//! ```

use std::fmt;

use thiserror::Error;

/// Scalar kinds a parameter value can be coerced into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    /// `bool`
    Bool,
    /// `i8`
    I8,
    /// `i16`
    I16,
    /// `i32`
    I32,
    /// `i64`
    I64,
    /// `isize`
    Isize,
    /// `u8`
    U8,
    /// `u16`
    U16,
    /// `u32`
    U32,
    /// `u64`
    U64,
    /// `usize`
    Usize,
    /// `f32`
    F32,
    /// `f64`
    F64,
    /// `String`
    String,
}

impl ScalarKind {
    /// Returns the Rust type name of this kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::Isize => "isize",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::Usize => "usize",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::String => "String",
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A coerced scalar value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// `bool` value
    Bool(bool),
    /// `i8` value
    I8(i8),
    /// `i16` value
    I16(i16),
    /// `i32` value
    I32(i32),
    /// `i64` value
    I64(i64),
    /// `isize` value
    Isize(isize),
    /// `u8` value
    U8(u8),
    /// `u16` value
    U16(u16),
    /// `u32` value
    U32(u32),
    /// `u64` value
    U64(u64),
    /// `usize` value
    Usize(usize),
    /// `f32` value
    F32(f32),
    /// `f64` value
    F64(f64),
    /// `String` value
    String(String),
}

/// Error returned when text cannot be coerced into a scalar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("parsing '{text}' as {kind}: {reason}")]
pub struct CoerceError {
    text: String,
    kind: ScalarKind,
    reason: String,
}

impl CoerceError {
    /// Creates a new coercion error.
    #[must_use]
    pub fn new(text: impl Into<String>, kind: ScalarKind, reason: impl fmt::Display) -> Self {
        Self {
            text: text.into(),
            kind,
            reason: reason.to_string(),
        }
    }

    /// Returns the offending text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the target kind.
    #[must_use]
    pub fn kind(&self) -> ScalarKind {
        self.kind
    }

    /// Returns the underlying parse failure.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// A Rust scalar type that parameter text can be coerced into.
pub trait ScalarValue: Sized + Default {
    /// The kind implemented by this type.
    const KIND: ScalarKind;

    /// Parses `text` into a value of this type.
    ///
    /// # Errors
    ///
    /// Returns [`CoerceError`] if the text is not a valid value of this kind.
    fn from_text(text: &str) -> Result<Self, CoerceError>;

    /// Wraps the value into a [`Scalar`].
    fn into_scalar(self) -> Scalar;
}

/// Coerces `text` into a scalar of the given kind.
///
/// # Errors
///
/// Returns [`CoerceError`] carrying the kind, the text and the parse failure.
pub fn coerce(text: &str, kind: ScalarKind) -> Result<Scalar, CoerceError> {
    fn scalar<T: ScalarValue>(text: &str) -> Result<Scalar, CoerceError> {
        T::from_text(text).map(ScalarValue::into_scalar)
    }

    match kind {
        ScalarKind::Bool => scalar::<bool>(text),
        ScalarKind::I8 => scalar::<i8>(text),
        ScalarKind::I16 => scalar::<i16>(text),
        ScalarKind::I32 => scalar::<i32>(text),
        ScalarKind::I64 => scalar::<i64>(text),
        ScalarKind::Isize => scalar::<isize>(text),
        ScalarKind::U8 => scalar::<u8>(text),
        ScalarKind::U16 => scalar::<u16>(text),
        ScalarKind::U32 => scalar::<u32>(text),
        ScalarKind::U64 => scalar::<u64>(text),
        ScalarKind::Usize => scalar::<usize>(text),
        ScalarKind::F32 => scalar::<f32>(text),
        ScalarKind::F64 => scalar::<f64>(text),
        ScalarKind::String => scalar::<String>(text),
    }
}

impl ScalarValue for bool {
    const KIND: ScalarKind = ScalarKind::Bool;

    fn from_text(text: &str) -> Result<Self, CoerceError> {
        match text {
            "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
            "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
            _ => Err(CoerceError::new(text, Self::KIND, "invalid syntax")),
        }
    }

    fn into_scalar(self) -> Scalar {
        Scalar::Bool(self)
    }
}

impl ScalarValue for String {
    const KIND: ScalarKind = ScalarKind::String;

    fn from_text(text: &str) -> Result<Self, CoerceError> {
        Ok(text.to_string())
    }

    fn into_scalar(self) -> Scalar {
        Scalar::String(self)
    }
}

/// Splits the base off unsigned digits.
///
/// `0x`, `0o` and `0b` select hex, octal and binary; any other leading `0`
/// followed by more digits selects octal.
fn split_radix(digits: &str) -> (u32, &str) {
    let bytes = digits.as_bytes();
    if bytes.len() < 2 || bytes[0] != b'0' {
        return (10, digits);
    }
    match bytes[1].to_ascii_lowercase() {
        b'x' if bytes.len() > 2 => (16, &digits[2..]),
        b'o' if bytes.len() > 2 => (8, &digits[2..]),
        b'b' if bytes.len() > 2 => (2, &digits[2..]),
        _ => (8, &digits[1..]),
    }
}

/// Checks that every `_` sits between two digits, or right after a base
/// prefix.
fn underscores_ok(digits: &str) -> bool {
    let bytes = digits.as_bytes();
    let (mut i, hex, mut after_digit) = match bytes {
        [b'0', p, ..] if matches!(p.to_ascii_lowercase(), b'x' | b'o' | b'b') => {
            (2, p.eq_ignore_ascii_case(&b'x'), true)
        }
        _ => (0, false, false),
    };
    let mut after_underscore = false;

    while i < bytes.len() {
        let b = bytes[i];
        if b.is_ascii_digit() || (hex && b.is_ascii_hexdigit()) {
            after_digit = true;
            after_underscore = false;
        } else if b == b'_' {
            if !after_digit {
                return false;
            }
            after_digit = false;
            after_underscore = true;
        } else {
            return false;
        }
        i += 1;
    }
    !after_underscore
}

/// Parses the magnitude of an integer, after any sign has been removed.
fn parse_magnitude(text: &str, digits: &str, kind: ScalarKind) -> Result<u128, CoerceError> {
    let invalid = || CoerceError::new(text, kind, "invalid digit found in string");

    let cleaned;
    let digits = if digits.contains('_') {
        if !underscores_ok(digits) {
            return Err(invalid());
        }
        cleaned = digits.replace('_', "");
        cleaned.as_str()
    } else {
        digits
    };

    let (radix, digits) = split_radix(digits);
    if digits.starts_with(['+', '-']) {
        return Err(invalid());
    }
    u128::from_str_radix(digits, radix).map_err(|e| CoerceError::new(text, kind, e))
}

/// Returns `true` if `text` spells infinity rather than overflowing to it.
fn is_infinity_literal(text: &str) -> bool {
    let unsigned = text.strip_prefix(['+', '-']).unwrap_or(text);
    unsigned.eq_ignore_ascii_case("inf") || unsigned.eq_ignore_ascii_case("infinity")
}

fn out_of_range(text: &str, kind: ScalarKind) -> CoerceError {
    CoerceError::new(text, kind, format_args!("number out of range for {kind}"))
}

macro_rules! signed_scalar {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl ScalarValue for $ty {
                const KIND: ScalarKind = ScalarKind::$kind;

                fn from_text(text: &str) -> Result<Self, CoerceError> {
                    let (negative, digits) = match text.as_bytes().first() {
                        Some(b'-') => (true, &text[1..]),
                        Some(b'+') => (false, &text[1..]),
                        _ => (false, text),
                    };
                    let magnitude = parse_magnitude(text, digits, Self::KIND)?;
                    let magnitude = i128::try_from(magnitude)
                        .map_err(|_| out_of_range(text, Self::KIND))?;
                    let value = if negative { -magnitude } else { magnitude };
                    <$ty>::try_from(value).map_err(|_| out_of_range(text, Self::KIND))
                }

                fn into_scalar(self) -> Scalar {
                    Scalar::$kind(self)
                }
            }
        )*
    };
}

macro_rules! unsigned_scalar {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl ScalarValue for $ty {
                const KIND: ScalarKind = ScalarKind::$kind;

                fn from_text(text: &str) -> Result<Self, CoerceError> {
                    let magnitude = parse_magnitude(text, text, Self::KIND)?;
                    <$ty>::try_from(magnitude).map_err(|_| out_of_range(text, Self::KIND))
                }

                fn into_scalar(self) -> Scalar {
                    Scalar::$kind(self)
                }
            }
        )*
    };
}

macro_rules! float_scalar {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl ScalarValue for $ty {
                const KIND: ScalarKind = ScalarKind::$kind;

                fn from_text(text: &str) -> Result<Self, CoerceError> {
                    let value = text
                        .parse::<$ty>()
                        .map_err(|e| CoerceError::new(text, Self::KIND, e))?;
                    if value.is_infinite() && !is_infinity_literal(text) {
                        return Err(out_of_range(text, Self::KIND));
                    }
                    Ok(value)
                }

                fn into_scalar(self) -> Scalar {
                    Scalar::$kind(self)
                }
            }
        )*
    };
}

signed_scalar!(i8 => I8, i16 => I16, i32 => I32, i64 => I64, isize => Isize);
unsigned_scalar!(u8 => U8, u16 => U16, u32 => U32, u64 => U64, usize => Usize);
float_scalar!(f32 => F32, f64 => F64);

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_bool_tokens() {
        for text in ["1", "t", "T", "TRUE", "true", "True"] {
            assert_eq!(coerce(text, ScalarKind::Bool).unwrap(), Scalar::Bool(true));
        }
        for text in ["0", "f", "F", "FALSE", "false", "False"] {
            assert_eq!(coerce(text, ScalarKind::Bool).unwrap(), Scalar::Bool(false));
        }
        for text in ["yes", "tRUE", "", " true"] {
            assert!(coerce(text, ScalarKind::Bool).is_err(), "{text:?}");
        }
    }

    #[test]
    fn test_integer_prefixes() {
        assert_eq!(i32::from_text("0x1f").unwrap(), 31);
        assert_eq!(i32::from_text("0X1F").unwrap(), 31);
        assert_eq!(i32::from_text("-0x10").unwrap(), -16);
        assert_eq!(u16::from_text("0o17").unwrap(), 15);
        assert_eq!(u16::from_text("0b101").unwrap(), 5);
        assert_eq!(i64::from_text("+42").unwrap(), 42);
    }

    #[test]
    fn test_leading_zero_is_octal() {
        assert_eq!(i32::from_text("010").unwrap(), 8);
        assert_eq!(i32::from_text("-017").unwrap(), -15);
        assert_eq!(u8::from_text("00").unwrap(), 0);
        assert_eq!(u8::from_text("0").unwrap(), 0);
        assert!(i32::from_text("08").is_err());
        assert!(i32::from_text("0x").is_err());
    }

    #[test]
    fn test_underscore_separators() {
        assert_eq!(i32::from_text("1_000").unwrap(), 1000);
        assert_eq!(i64::from_text("-1_000_000").unwrap(), -1_000_000);
        assert_eq!(u32::from_text("0x_ff_ff").unwrap(), 0xffff);
        assert_eq!(u8::from_text("0b_1010").unwrap(), 10);
        assert_eq!(i32::from_text("0_10").unwrap(), 8);
        for text in ["_1", "1_", "1__0", "0x_", "_", "1_a"] {
            assert!(i32::from_text(text).is_err(), "{text:?}");
        }
    }

    #[test]
    fn test_integer_ranges() {
        assert_eq!(i8::from_text("-128").unwrap(), i8::MIN);
        assert_eq!(i8::from_text("127").unwrap(), i8::MAX);
        assert_eq!(
            i8::from_text("128").unwrap_err().reason(),
            "number out of range for i8"
        );
        assert_eq!(u64::from_text("18446744073709551615").unwrap(), u64::MAX);
        assert!(u64::from_text("18446744073709551616").is_err());
        assert_eq!(i64::from_text("-9223372036854775808").unwrap(), i64::MIN);
    }

    #[test]
    fn test_integer_syntax_errors() {
        for text in ["", "-", "abc", "1.5", "0x", "0x-1", "--1", " 1"] {
            assert!(i32::from_text(text).is_err(), "{text:?}");
        }
        for text in ["-1", "+1"] {
            assert!(u32::from_text(text).is_err(), "{text:?}");
        }
    }

    #[test]
    fn test_floats() {
        assert_eq!(f64::from_text("1.5").unwrap(), 1.5);
        assert_eq!(f64::from_text("-2e3").unwrap(), -2000.0);
        assert!(f64::from_text("inf").unwrap().is_infinite());
        assert!(f32::from_text("NaN").unwrap().is_nan());
        assert!(f64::from_text("one").is_err());
    }

    #[test]
    fn test_float_overflow_is_out_of_range() {
        let err = f32::from_text("1e40").unwrap_err();
        assert_eq!(err.reason(), "number out of range for f32");
        assert!(f64::from_text("1e400").is_err());
        assert_eq!(f32::from_text("3.4e38").unwrap(), 3.4e38);
        assert!(f32::from_text("-Infinity").unwrap().is_infinite());
        assert!(f64::from_text("+inf").unwrap().is_infinite());
    }

    #[test]
    fn test_string_is_identity() {
        assert_eq!(
            coerce(" a b ", ScalarKind::String).unwrap(),
            Scalar::String(" a b ".to_string())
        );
    }

    #[test]
    fn test_error_message() {
        let err = coerce("abc", ScalarKind::I32).unwrap_err();
        assert_eq!(err.text(), "abc");
        assert_eq!(err.kind(), ScalarKind::I32);
        assert_eq!(
            err.to_string(),
            "parsing 'abc' as i32: invalid digit found in string"
        );
    }

    proptest! {
        #[test]
        fn proptest_i64_round_trip(value in any::<i64>()) {
            prop_assert_eq!(coerce(&value.to_string(), ScalarKind::I64).unwrap(), Scalar::I64(value));
        }

        #[test]
        fn proptest_u32_round_trip(value in any::<u32>()) {
            prop_assert_eq!(coerce(&value.to_string(), ScalarKind::U32).unwrap(), Scalar::U32(value));
        }

        #[test]
        fn proptest_i16_round_trip(value in any::<i16>()) {
            prop_assert_eq!(coerce(&value.to_string(), ScalarKind::I16).unwrap(), Scalar::I16(value));
        }

        #[test]
        fn proptest_f64_round_trip(value in proptest::num::f64::NORMAL | proptest::num::f64::ZERO) {
            prop_assert_eq!(coerce(&value.to_string(), ScalarKind::F64).unwrap(), Scalar::F64(value));
        }

        #[test]
        fn proptest_bool_round_trip(value in any::<bool>()) {
            prop_assert_eq!(coerce(&value.to_string(), ScalarKind::Bool).unwrap(), Scalar::Bool(value));
        }

        #[test]
        fn proptest_string_round_trip(value in ".*") {
            prop_assert_eq!(coerce(&value, ScalarKind::String).unwrap(), Scalar::String(value.clone()));
        }
    }
}
