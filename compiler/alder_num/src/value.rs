//! Compile-time constant values.

use std::fmt;
use std::sync::Arc;

use crate::{Logic, SvInt};

/// The result of constant evaluation.
///
/// `Bad` is the sticky failure sentinel: once produced it propagates
/// through every operation without further diagnostics, so a single
/// root cause is reported exactly once.
#[derive(Clone, Debug, PartialEq)]
pub enum ConstantValue {
    Bad,
    Integer(SvInt),
    Real(f64),
    Str(Arc<str>),
}

impl ConstantValue {
    #[inline]
    pub fn is_bad(&self) -> bool {
        matches!(self, ConstantValue::Bad)
    }

    #[inline]
    pub fn is_integer(&self) -> bool {
        matches!(self, ConstantValue::Integer(_))
    }

    /// The integer payload; callers check `is_integer` first (binding
    /// does so through `require_integral`).
    pub fn integer(&self) -> Option<&SvInt> {
        match self {
            ConstantValue::Integer(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_integer(self) -> Option<SvInt> {
        match self {
            ConstantValue::Integer(v) => Some(v),
            _ => None,
        }
    }

    /// Truthiness for conditional evaluation.
    pub fn to_logic(&self) -> Logic {
        match self {
            ConstantValue::Bad => Logic::X,
            ConstantValue::Integer(v) => v.to_logic(),
            ConstantValue::Real(r) => {
                if *r == 0.0 {
                    Logic::Zero
                } else {
                    Logic::One
                }
            }
            ConstantValue::Str(s) => {
                if s.is_empty() {
                    Logic::Zero
                } else {
                    Logic::One
                }
            }
        }
    }
}

impl From<SvInt> for ConstantValue {
    fn from(v: SvInt) -> Self {
        ConstantValue::Integer(v)
    }
}

impl fmt::Display for ConstantValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstantValue::Bad => f.write_str("<bad>"),
            ConstantValue::Integer(v) => write!(f, "{v}"),
            ConstantValue::Real(r) => write!(f, "{r}"),
            ConstantValue::Str(s) => write!(f, "\"{s}\""),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_is_bad() {
        assert!(ConstantValue::Bad.is_bad());
        assert!(!ConstantValue::Integer(SvInt::zero(1)).is_bad());
        assert_eq!(ConstantValue::Bad.to_logic(), Logic::X);
    }

    #[test]
    fn integer_access() {
        let cv = ConstantValue::from(SvInt::from_u64(42, 32, true));
        assert!(cv.is_integer());
        assert_eq!(cv.integer().unwrap().as_i32(), Some(42));
        assert_eq!(ConstantValue::Real(1.5).integer(), None);
    }

    #[test]
    fn truthiness() {
        assert_eq!(
            ConstantValue::Integer(SvInt::zero(8)).to_logic(),
            Logic::Zero
        );
        assert_eq!(ConstantValue::Real(0.0).to_logic(), Logic::Zero);
        assert_eq!(ConstantValue::Real(2.5).to_logic(), Logic::One);
        assert_eq!(ConstantValue::Str("".into()).to_logic(), Logic::Zero);
        assert_eq!(ConstantValue::Str("x".into()).to_logic(), Logic::One);
    }
}
