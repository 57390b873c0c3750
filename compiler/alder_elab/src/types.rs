//! The type system.
//!
//! Types are interned by id in the compilation. Integral types carry
//! width, signedness, and two/four-state; packed arrays wrap an
//! integral element with a constant range. Unpacked shapes (fixed,
//! dynamic, associative, queue) wrap any element type.

use alder_num::ConstantRange;
use alder_syntax::Name;

use crate::symbol::SymbolId;

/// Index of a type in the compilation's type arena.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct TypeId(pub u32);

/// Floating-point families.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FloatKind {
    ShortReal,
    Real,
    RealTime,
}

/// A resolved type.
#[derive(Clone, Debug, PartialEq)]
pub enum Type {
    /// Produced by failed resolution; silences downstream errors.
    Error,
    Void,
    String,
    Event,
    Real(FloatKind),
    /// Scalars, vectors, and the atom types, flattened to their
    /// essential properties.
    Integral {
        width: u32,
        signed: bool,
        four_state: bool,
    },
    /// A packed dimension applied to an integral element.
    PackedArray {
        element: TypeId,
        range: ConstantRange,
    },
    Enum {
        base: TypeId,
        /// The enum's value symbols in declaration order. Also what
        /// keeps two structurally identical enums distinct types.
        members: Vec<SymbolId>,
    },
    PackedStruct {
        fields: Vec<(Name, TypeId)>,
        width: u32,
    },
    UnpackedStruct {
        fields: Vec<(Name, TypeId)>,
    },
    FixedArray {
        element: TypeId,
        range: ConstantRange,
    },
    DynamicArray {
        element: TypeId,
    },
    AssociativeArray {
        element: TypeId,
        index: Option<TypeId>,
    },
    Queue {
        element: TypeId,
        max_bound: Option<u32>,
    },
}

/// Pre-allocated builtin type ids; see `Compilation::new` for the
/// matching table construction.
pub mod builtin {
    use super::TypeId;

    pub const ERROR: TypeId = TypeId(0);
    pub const VOID: TypeId = TypeId(1);
    pub const STRING: TypeId = TypeId(2);
    pub const EVENT: TypeId = TypeId(3);
    pub const REAL: TypeId = TypeId(4);
    pub const SHORT_REAL: TypeId = TypeId(5);
    pub const REAL_TIME: TypeId = TypeId(6);
    pub const LOGIC: TypeId = TypeId(7);
    pub const BIT: TypeId = TypeId(8);
    pub const INT: TypeId = TypeId(9);
    pub const INTEGER: TypeId = TypeId(10);
    pub const BYTE: TypeId = TypeId(11);
    pub const SHORT_INT: TypeId = TypeId(12);
    pub const LONG_INT: TypeId = TypeId(13);
    pub const TIME: TypeId = TypeId(14);

    /// Number of pre-allocated entries.
    pub const COUNT: usize = 15;
}

/// The fixed table of builtin types, in id order.
pub fn builtin_types() -> Vec<Type> {
    vec![
        Type::Error,
        Type::Void,
        Type::String,
        Type::Event,
        Type::Real(FloatKind::Real),
        Type::Real(FloatKind::ShortReal),
        Type::Real(FloatKind::RealTime),
        Type::Integral {
            width: 1,
            signed: false,
            four_state: true,
        },
        Type::Integral {
            width: 1,
            signed: false,
            four_state: false,
        },
        Type::Integral {
            width: 32,
            signed: true,
            four_state: false,
        },
        Type::Integral {
            width: 32,
            signed: true,
            four_state: true,
        },
        Type::Integral {
            width: 8,
            signed: true,
            four_state: false,
        },
        Type::Integral {
            width: 16,
            signed: true,
            four_state: false,
        },
        Type::Integral {
            width: 64,
            signed: true,
            four_state: false,
        },
        Type::Integral {
            width: 64,
            signed: false,
            four_state: true,
        },
    ]
}

impl crate::Compilation {
    /// Register a type and return its id.
    pub fn intern_type(&self, ty: Type) -> TypeId {
        let mut types = self.types_mut();
        // Builtins and common shapes dedupe by equality scan over a
        // small prefix; the table stays compact in practice.
        if let Some(idx) = types.iter().position(|t| *t == ty) {
            return TypeId(idx as u32);
        }
        let id = TypeId(types.len() as u32);
        types.push(ty);
        id
    }

    pub fn type_kind(&self, id: TypeId) -> Type {
        self.types_ref()[id.0 as usize].clone()
    }

    /// Total bit width of a packed type; `None` for unpacked types.
    pub fn type_bit_width(&self, id: TypeId) -> Option<u32> {
        match self.type_kind(id) {
            Type::Integral { width, .. } => Some(width),
            Type::PackedArray { element, range } => {
                Some(self.type_bit_width(element)? * range.width())
            }
            Type::Enum { base, .. } => self.type_bit_width(base),
            Type::PackedStruct { width, .. } => Some(width),
            Type::Error => Some(1),
            _ => None,
        }
    }

    pub fn type_is_integral(&self, id: TypeId) -> bool {
        matches!(
            self.type_kind(id),
            Type::Integral { .. }
                | Type::PackedArray { .. }
                | Type::Enum { .. }
                | Type::PackedStruct { .. }
        )
    }

    pub fn type_is_four_state(&self, id: TypeId) -> bool {
        match self.type_kind(id) {
            Type::Integral { four_state, .. } => four_state,
            Type::PackedArray { element, .. } | Type::Enum { base: element, .. } => {
                self.type_is_four_state(element)
            }
            Type::PackedStruct { fields, .. } => fields
                .iter()
                .any(|&(_, field)| self.type_is_four_state(field)),
            _ => false,
        }
    }

    pub fn type_is_signed(&self, id: TypeId) -> bool {
        match self.type_kind(id) {
            Type::Integral { signed, .. } => signed,
            Type::PackedArray { element, .. } | Type::Enum { base: element, .. } => {
                self.type_is_signed(element)
            }
            _ => false,
        }
    }

    pub fn type_is_error(&self, id: TypeId) -> bool {
        matches!(self.type_kind(id), Type::Error)
    }

    /// An integral type with the given properties, reusing builtins
    /// where they match.
    pub fn integral_type(&self, width: u32, signed: bool, four_state: bool) -> TypeId {
        self.intern_type(Type::Integral {
            width,
            signed,
            four_state,
        })
    }

    /// Result type for a packed range applied to an element.
    pub fn packed_array_type(&self, element: TypeId, range: ConstantRange) -> TypeId {
        self.intern_type(Type::PackedArray { element, range })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alder_syntax::StringInterner;

    fn comp() -> crate::Compilation {
        let interner: &'static StringInterner = Box::leak(Box::new(StringInterner::new()));
        crate::Compilation::new(interner)
    }

    #[test]
    fn builtin_widths() {
        let c = comp();
        assert_eq!(c.type_bit_width(builtin::LOGIC), Some(1));
        assert_eq!(c.type_bit_width(builtin::INT), Some(32));
        assert_eq!(c.type_bit_width(builtin::BYTE), Some(8));
        assert_eq!(c.type_bit_width(builtin::TIME), Some(64));
        assert!(c.type_is_four_state(builtin::LOGIC));
        assert!(!c.type_is_four_state(builtin::BIT));
        assert!(c.type_is_signed(builtin::INT));
    }

    #[test]
    fn packed_array_width() {
        let c = comp();
        let v = c.packed_array_type(builtin::LOGIC, ConstantRange::new(7, 0));
        assert_eq!(c.type_bit_width(v), Some(8));
        assert!(c.type_is_integral(v));
        assert!(c.type_is_four_state(v));

        let m = c.packed_array_type(v, ConstantRange::new(3, 0));
        assert_eq!(c.type_bit_width(m), Some(32));
    }

    #[test]
    fn interning_dedupes() {
        let c = comp();
        let a = c.integral_type(1, false, true);
        assert_eq!(a, builtin::LOGIC);
        let b = c.packed_array_type(builtin::BIT, ConstantRange::new(3, 0));
        let b2 = c.packed_array_type(builtin::BIT, ConstantRange::new(3, 0));
        assert_eq!(b, b2);
    }

    #[test]
    fn unpacked_types_have_no_bit_width() {
        let c = comp();
        let arr = c.intern_type(Type::DynamicArray {
            element: builtin::INT,
        });
        assert_eq!(c.type_bit_width(arr), None);
        assert!(!c.type_is_integral(arr));
    }
}
