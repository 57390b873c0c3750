//! Numeric foundations: four-valued integers and constant values.
//!
//! [`SvInt`] is an arbitrary-width integer whose bits take the values
//! 0, 1, X (unknown) or Z (high impedance). Arithmetic and comparison
//! propagate unknowns per the language rules; the two equality flavors
//! (`==` vs `===`) differ exactly in how X/Z bits compare.
//!
//! [`ConstantValue`] is what constant evaluation produces: an integer,
//! a real, a string, or the sticky `Bad` sentinel.

mod logic;
mod range;
mod svint;
mod value;

pub use logic::Logic;
pub use range::ConstantRange;
pub use svint::{LiteralBase, SvInt};
pub use value::ConstantValue;
