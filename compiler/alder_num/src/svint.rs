//! Arbitrary-precision four-state integers.
//!
//! An [`SvInt`] stores two bit planes in 64-bit words: the value plane
//! and the unknown plane. A bit is 0/1 when its unknown bit is clear;
//! when set, the value bit distinguishes X (0) from Z (1). The unknown
//! plane is kept empty whenever no bit is unknown, so the common
//! two-state case pays nothing for four-state support.
//!
//! Arithmetic operators follow the language's propagation rules: any
//! X or Z bit in an operand makes the whole arithmetic result X.
//! Bitwise operators work per bit through the [`Logic`] truth tables.

use std::cmp::Ordering;
use std::fmt;

use smallvec::{smallvec, SmallVec};

use crate::Logic;

type Words = SmallVec<[u64; 2]>;

/// Number base of an integer literal.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum LiteralBase {
    Binary,
    Octal,
    Decimal,
    Hex,
}

impl LiteralBase {
    /// Bits consumed per digit; decimal has no fixed width per digit.
    pub fn bits_per_digit(self) -> Option<u32> {
        match self {
            LiteralBase::Binary => Some(1),
            LiteralBase::Octal => Some(3),
            LiteralBase::Hex => Some(4),
            LiteralBase::Decimal => None,
        }
    }

    /// The base letter used in literals (`b`, `o`, `d`, `h`).
    pub fn to_char(self) -> char {
        match self {
            LiteralBase::Binary => 'b',
            LiteralBase::Octal => 'o',
            LiteralBase::Decimal => 'd',
            LiteralBase::Hex => 'h',
        }
    }

    pub fn digit_value(self, c: char) -> Option<u64> {
        let v = c.to_digit(16)? as u64;
        let max = match self {
            LiteralBase::Binary => 2,
            LiteralBase::Octal => 8,
            LiteralBase::Decimal => 10,
            LiteralBase::Hex => 16,
        };
        (v < max).then_some(v)
    }
}

/// An arbitrary-width four-state integer.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct SvInt {
    width: u32,
    signed: bool,
    val: Words,
    /// Unknown plane; empty when the value is fully known.
    unk: Words,
}

fn num_words(width: u32) -> usize {
    (width as usize).div_ceil(64)
}

fn mask_words(words: &mut [u64], width: u32) {
    let bits = width as usize % 64;
    if bits != 0 {
        if let Some(last) = words.last_mut() {
            *last &= (1u64 << bits) - 1;
        }
    }
}

impl SvInt {
    /// Maximum representable bit width. Widths beyond this are
    /// rejected during binding with `ValueExceedsMaxBitWidth`.
    pub const MAX_BITS: u32 = (1 << 24) - 1;

    /// Default width of unsized literals and of the `integer` type.
    pub const DEFAULT_WIDTH: u32 = 32;

    fn with_planes(width: u32, signed: bool, mut val: Words, mut unk: Words) -> Self {
        debug_assert!(width >= 1, "zero-width integer");
        val.resize(num_words(width), 0);
        mask_words(&mut val, width);
        if !unk.is_empty() {
            unk.resize(num_words(width), 0);
            mask_words(&mut unk, width);
            if unk.iter().all(|&w| w == 0) {
                unk.clear();
            }
        }
        SvInt {
            width,
            signed,
            val,
            unk,
        }
    }

    pub fn zero(width: u32) -> Self {
        Self::from_u64(0, width, false)
    }

    pub fn from_u64(value: u64, width: u32, signed: bool) -> Self {
        Self::with_planes(width, signed, smallvec![value], SmallVec::new())
    }

    pub fn from_i64(value: i64, width: u32) -> Self {
        let words = num_words(width);
        let fill = if value < 0 { u64::MAX } else { 0 };
        let mut val: Words = smallvec![fill; words];
        val[0] = value as u64;
        if words > 1 && value >= 0 {
            for w in val.iter_mut().skip(1) {
                *w = 0;
            }
        }
        Self::with_planes(width, true, val, SmallVec::new())
    }

    /// A value with every bit set to `fill` (used by unbased unsized
    /// literals and X-propagation).
    pub fn filled(fill: Logic, width: u32, signed: bool) -> Self {
        let words = num_words(width);
        let (v, u) = match fill {
            Logic::Zero => (0u64, 0u64),
            Logic::One => (u64::MAX, 0),
            Logic::X => (0, u64::MAX),
            Logic::Z => (u64::MAX, u64::MAX),
        };
        Self::with_planes(width, signed, smallvec![v; words], smallvec![u; words])
    }

    pub fn all_x(width: u32) -> Self {
        Self::filled(Logic::X, width, false)
    }

    pub fn all_z(width: u32) -> Self {
        Self::filled(Logic::Z, width, false)
    }

    // === Accessors ===

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn is_signed(&self) -> bool {
        self.signed
    }

    /// Return the same value with a different signedness flag.
    #[must_use]
    pub fn as_signed(mut self, signed: bool) -> Self {
        self.signed = signed;
        self
    }

    #[inline]
    pub fn has_unknown(&self) -> bool {
        !self.unk.is_empty()
    }

    pub fn get_bit(&self, index: u32) -> Logic {
        debug_assert!(index < self.width);
        let word = index as usize / 64;
        let bit = index % 64;
        let v = (self.val[word] >> bit) & 1;
        let u = if self.unk.is_empty() {
            0
        } else {
            (self.unk[word] >> bit) & 1
        };
        match (u, v) {
            (0, 0) => Logic::Zero,
            (0, _) => Logic::One,
            (_, 0) => Logic::X,
            _ => Logic::Z,
        }
    }

    fn msb(&self) -> Logic {
        self.get_bit(self.width - 1)
    }

    /// True for signed values whose (known) sign bit is set.
    pub fn is_negative(&self) -> bool {
        self.signed && self.msb() == Logic::One
    }

    pub fn is_zero(&self) -> bool {
        self.unk.is_empty() && self.val.iter().all(|&w| w == 0)
    }

    /// Truthiness: 1 if any bit is known 1, X if no known 1 but some
    /// unknown bit, 0 otherwise.
    pub fn to_logic(&self) -> Logic {
        let known_one = if self.unk.is_empty() {
            self.val.iter().any(|&w| w != 0)
        } else {
            self.val
                .iter()
                .zip(self.unk.iter())
                .any(|(&v, &u)| v & !u != 0)
        };
        if known_one {
            Logic::One
        } else if self.has_unknown() {
            Logic::X
        } else {
            Logic::Zero
        }
    }

    // === Conversions ===

    fn low_u64_checked(&self) -> Option<u64> {
        if self.val.iter().skip(1).any(|&w| w != 0) {
            None
        } else {
            Some(self.val[0])
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        if self.has_unknown() || self.is_negative() {
            return None;
        }
        self.low_u64_checked()
    }

    pub fn as_i64(&self) -> Option<i64> {
        if self.has_unknown() {
            return None;
        }
        if self.is_negative() {
            let magnitude = self.negate().low_u64_checked()?;
            if magnitude <= i64::MAX as u64 + 1 {
                Some((magnitude as i128).wrapping_neg() as i64)
            } else {
                None
            }
        } else {
            i64::try_from(self.low_u64_checked()?).ok()
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        i32::try_from(self.as_i64()?).ok()
    }

    pub fn as_u32(&self) -> Option<u32> {
        u32::try_from(self.as_u64()?).ok()
    }

    // === Resizing ===

    /// Resize to `width`, sign-extending when `self` is signed (the
    /// extension bit is the MSB, which may itself be X or Z) and
    /// zero-extending otherwise. Truncation drops high bits.
    #[must_use]
    pub fn resize(&self, width: u32) -> Self {
        if width == self.width {
            return self.clone();
        }
        if width < self.width {
            let mut val = self.val.clone();
            let mut unk = self.unk.clone();
            val.truncate(num_words(width));
            unk.truncate(num_words(width).min(unk.len()));
            return Self::with_planes(width, self.signed, val, unk);
        }

        let fill = if self.signed { self.msb() } else { Logic::Zero };
        let (fv, fu) = match fill {
            Logic::Zero => (0u64, 0u64),
            Logic::One => (u64::MAX, 0),
            Logic::X => (0, u64::MAX),
            Logic::Z => (u64::MAX, u64::MAX),
        };

        let words = num_words(width);
        let mut val: Words = smallvec![fv; words];
        let mut unk: Words = if fu != 0 || !self.unk.is_empty() {
            smallvec![fu; words]
        } else {
            SmallVec::new()
        };

        // Copy the low words, then patch the partial top word of the
        // old width with fill bits.
        for (i, &w) in self.val.iter().enumerate() {
            val[i] = w;
        }
        if !unk.is_empty() {
            for i in 0..self.val.len() {
                unk[i] = self.unk.get(i).copied().unwrap_or(0);
            }
        }
        let top_bits = self.width as usize % 64;
        if top_bits != 0 {
            let top = self.val.len() - 1;
            let high_mask = !((1u64 << top_bits) - 1);
            val[top] = (val[top] & !high_mask) | (fv & high_mask);
            if !unk.is_empty() {
                unk[top] = (unk[top] & !high_mask) | (fu & high_mask);
            }
        }
        Self::with_planes(width, self.signed, val, unk)
    }

    // === Arithmetic ===

    fn common_width(&self, other: &SvInt) -> u32 {
        self.width.max(other.width)
    }

    fn arithmetic_operands(&self, other: &SvInt) -> Option<(SvInt, SvInt, u32, bool)> {
        if self.has_unknown() || other.has_unknown() {
            return None;
        }
        let width = self.common_width(other);
        let signed = self.signed && other.signed;
        Some((self.resize(width), other.resize(width), width, signed))
    }

    pub fn add(&self, other: &SvInt) -> SvInt {
        let Some((a, b, width, signed)) = self.arithmetic_operands(other) else {
            return SvInt::all_x(self.common_width(other)).as_signed(self.signed && other.signed);
        };
        let mut out: Words = smallvec![0; a.val.len()];
        let mut carry = 0u64;
        for i in 0..a.val.len() {
            let (s1, c1) = a.val[i].overflowing_add(b.val[i]);
            let (s2, c2) = s1.overflowing_add(carry);
            out[i] = s2;
            carry = u64::from(c1) + u64::from(c2);
        }
        Self::with_planes(width, signed, out, SmallVec::new())
    }

    pub fn sub(&self, other: &SvInt) -> SvInt {
        let width = self.common_width(other);
        let signed = self.signed && other.signed;
        if self.has_unknown() || other.has_unknown() {
            return SvInt::all_x(width).as_signed(signed);
        }
        self.resize(width)
            .add(&other.resize(width).negate())
            .as_signed(signed)
    }

    /// Two's complement negation within the current width.
    #[must_use]
    pub fn negate(&self) -> SvInt {
        if self.has_unknown() {
            return SvInt::all_x(self.width).as_signed(self.signed);
        }
        let mut out: Words = self.val.iter().map(|w| !w).collect();
        mask_words(&mut out, self.width);
        let mut carry = 1u64;
        for w in out.iter_mut() {
            let (s, c) = w.overflowing_add(carry);
            *w = s;
            carry = u64::from(c);
            if carry == 0 {
                break;
            }
        }
        Self::with_planes(self.width, self.signed, out, SmallVec::new())
    }

    pub fn mul(&self, other: &SvInt) -> SvInt {
        let Some((a, b, width, signed)) = self.arithmetic_operands(other) else {
            return SvInt::all_x(self.common_width(other)).as_signed(self.signed && other.signed);
        };
        let n = a.val.len();
        let mut out: Words = smallvec![0; n];
        for i in 0..n {
            let mut carry = 0u128;
            for j in 0..n - i {
                let cur = out[i + j] as u128
                    + (a.val[i] as u128) * (b.val[j] as u128)
                    + carry;
                out[i + j] = cur as u64;
                carry = cur >> 64;
            }
        }
        Self::with_planes(width, signed, out, SmallVec::new())
    }

    pub fn div(&self, other: &SvInt) -> SvInt {
        self.div_rem(other).0
    }

    pub fn rem(&self, other: &SvInt) -> SvInt {
        self.div_rem(other).1
    }

    /// Truncating division and remainder. Division by zero yields
    /// all-X of the result width; it is not a diagnostic.
    pub fn div_rem(&self, other: &SvInt) -> (SvInt, SvInt) {
        let width = self.common_width(other);
        let signed = self.signed && other.signed;
        let bad = || {
            (
                SvInt::all_x(width).as_signed(signed),
                SvInt::all_x(width).as_signed(signed),
            )
        };
        if self.has_unknown() || other.has_unknown() || other.is_zero() {
            return bad();
        }

        let a = self.resize(width);
        let b = other.resize(width);
        let a_neg = signed && a.msb() == Logic::One;
        let b_neg = signed && b.msb() == Logic::One;
        let ua = if a_neg { a.negate() } else { a };
        let ub = if b_neg { b.negate() } else { b };

        let (q, r) = unsigned_div_rem(&ua.val, &ub.val, width);
        let mut quotient = Self::with_planes(width, signed, q, SmallVec::new());
        let mut remainder = Self::with_planes(width, signed, r, SmallVec::new());
        if a_neg != b_neg {
            quotient = quotient.negate();
        }
        // Remainder takes the sign of the dividend.
        if a_neg {
            remainder = remainder.negate();
        }
        (quotient, remainder)
    }

    /// Exponentiation with the language's special cases for negative
    /// exponents: 1 for base 1 (and even powers of -1), -1 for odd
    /// powers of -1, 0 for |base| > 1, X for base 0.
    pub fn pow(&self, exponent: &SvInt) -> SvInt {
        let width = self.common_width(exponent);
        let signed = self.signed && exponent.signed;
        if self.has_unknown() || exponent.has_unknown() {
            return SvInt::all_x(width).as_signed(signed);
        }

        let base = self.resize(width).as_signed(signed);
        let one = SvInt::from_u64(1, width, signed);
        if exponent.is_negative() {
            let exp_odd = exponent.get_bit(0) == Logic::One;
            return if base.eq_known(&one) {
                one
            } else if signed && base.eq_known(&one.negate()) {
                if exp_odd {
                    one.negate()
                } else {
                    one
                }
            } else if base.is_zero() {
                SvInt::all_x(width).as_signed(signed)
            } else {
                SvInt::zero(width).as_signed(signed)
            };
        }

        let mut result = one;
        let mut acc = base;
        // Exponent bits beyond 64 only matter when the base is 0, 1,
        // or -1 modulo 2^width; squaring saturates those cases anyway.
        let mut e = exponent.low_u64_checked().unwrap_or(u64::MAX);
        while e != 0 {
            if e & 1 != 0 {
                result = result.mul(&acc);
            }
            acc = acc.mul(&acc);
            e >>= 1;
        }
        result
    }

    // === Bitwise ===

    fn bitwise(&self, other: &SvInt, op: impl Fn(Logic, Logic) -> Logic) -> SvInt {
        let width = self.common_width(other);
        let a = self.resize(width);
        let b = other.resize(width);
        let mut out = SvInt::zero(width).as_signed(self.signed && other.signed);
        for i in 0..width {
            out.set_bit(i, op(a.get_bit(i), b.get_bit(i)));
        }
        out.renormalize();
        out
    }

    pub fn and(&self, other: &SvInt) -> SvInt {
        self.bitwise(other, Logic::and)
    }

    pub fn or(&self, other: &SvInt) -> SvInt {
        self.bitwise(other, Logic::or)
    }

    pub fn xor(&self, other: &SvInt) -> SvInt {
        self.bitwise(other, Logic::xor)
    }

    pub fn xnor(&self, other: &SvInt) -> SvInt {
        self.bitwise(other, |a, b| a.xor(b).not())
    }

    #[must_use]
    pub fn not(&self) -> SvInt {
        let mut out = SvInt::zero(self.width).as_signed(self.signed);
        for i in 0..self.width {
            out.set_bit(i, self.get_bit(i).not());
        }
        out.renormalize();
        out
    }

    /// Return a copy with one bit replaced.
    #[must_use]
    pub fn with_bit(mut self, index: u32, bit: Logic) -> SvInt {
        self.set_bit(index, bit);
        self.renormalize();
        self
    }

    fn set_bit(&mut self, index: u32, bit: Logic) {
        let word = index as usize / 64;
        let mask = 1u64 << (index % 64);
        if self.unk.is_empty() && bit.is_unknown() {
            self.unk = smallvec![0; self.val.len()];
        }
        match bit {
            Logic::Zero => {
                self.val[word] &= !mask;
                if !self.unk.is_empty() {
                    self.unk[word] &= !mask;
                }
            }
            Logic::One => {
                self.val[word] |= mask;
                if !self.unk.is_empty() {
                    self.unk[word] &= !mask;
                }
            }
            Logic::X => {
                self.val[word] &= !mask;
                self.unk[word] |= mask;
            }
            Logic::Z => {
                self.val[word] |= mask;
                self.unk[word] |= mask;
            }
        }
    }

    fn renormalize(&mut self) {
        if !self.unk.is_empty() && self.unk.iter().all(|&w| w == 0) {
            self.unk.clear();
        }
    }

    // === Shifts ===

    #[must_use]
    pub fn shl(&self, amount: u32) -> SvInt {
        if amount >= self.width {
            return SvInt::zero(self.width).as_signed(self.signed);
        }
        let mut out = SvInt::zero(self.width).as_signed(self.signed);
        for i in amount..self.width {
            out.set_bit(i, self.get_bit(i - amount));
        }
        out.renormalize();
        out
    }

    /// Logical shift right: fills with zeros.
    #[must_use]
    pub fn lshr(&self, amount: u32) -> SvInt {
        if amount >= self.width {
            return SvInt::zero(self.width).as_signed(self.signed);
        }
        let mut out = SvInt::zero(self.width).as_signed(self.signed);
        for i in 0..self.width - amount {
            out.set_bit(i, self.get_bit(i + amount));
        }
        out.renormalize();
        out
    }

    /// Arithmetic shift right: fills with the sign bit when signed.
    #[must_use]
    pub fn ashr(&self, amount: u32) -> SvInt {
        if !self.signed {
            return self.lshr(amount);
        }
        let fill = self.msb();
        let mut out = SvInt::zero(self.width).as_signed(true);
        for i in 0..self.width {
            let bit = if i + amount < self.width {
                self.get_bit(i + amount)
            } else {
                fill
            };
            out.set_bit(i, bit);
        }
        out.renormalize();
        out
    }

    // === Reductions ===

    pub fn reduction_and(&self) -> Logic {
        let mut acc = Logic::One;
        for i in 0..self.width {
            acc = acc.and(self.get_bit(i));
        }
        acc
    }

    pub fn reduction_or(&self) -> Logic {
        let mut acc = Logic::Zero;
        for i in 0..self.width {
            acc = acc.or(self.get_bit(i));
        }
        acc
    }

    pub fn reduction_xor(&self) -> Logic {
        let mut acc = Logic::Zero;
        for i in 0..self.width {
            acc = acc.xor(self.get_bit(i));
        }
        acc
    }

    // === Comparison ===

    fn eq_known(&self, other: &SvInt) -> bool {
        debug_assert!(!self.has_unknown() && !other.has_unknown());
        let width = self.common_width(other);
        self.resize(width).val == other.resize(width).val
    }

    /// Logical equality (`==`): X if any bit of either operand is
    /// unknown, otherwise 0/1.
    pub fn logical_eq(&self, other: &SvInt) -> Logic {
        if self.has_unknown() || other.has_unknown() {
            return Logic::X;
        }
        if self.eq_known(other) {
            Logic::One
        } else {
            Logic::Zero
        }
    }

    /// Case equality (`===`): exact bit-pattern comparison where X
    /// matches X and Z matches Z.
    pub fn case_eq(&self, other: &SvInt) -> bool {
        let width = self.common_width(other);
        let a = self.resize(width);
        let b = other.resize(width);
        (0..width).all(|i| a.get_bit(i) == b.get_bit(i))
    }

    /// Relational comparison; X when either operand has unknown bits.
    /// Signed comparison applies only when both operands are signed.
    pub fn compare(&self, other: &SvInt) -> Option<Ordering> {
        if self.has_unknown() || other.has_unknown() {
            return None;
        }
        let width = self.common_width(other);
        let signed = self.signed && other.signed;
        let a = self.resize(width);
        let b = other.resize(width);
        if signed {
            let a_neg = a.msb() == Logic::One;
            let b_neg = b.msb() == Logic::One;
            if a_neg != b_neg {
                return Some(if a_neg {
                    Ordering::Less
                } else {
                    Ordering::Greater
                });
            }
        }
        // Same sign (or unsigned): masked word comparison agrees with
        // two's complement ordering.
        for i in (0..a.val.len()).rev() {
            match a.val[i].cmp(&b.val[i]) {
                Ordering::Equal => continue,
                ord => return Some(ord),
            }
        }
        Some(Ordering::Equal)
    }

    pub fn less_than(&self, other: &SvInt) -> Logic {
        match self.compare(other) {
            None => Logic::X,
            Some(Ordering::Less) => Logic::One,
            Some(_) => Logic::Zero,
        }
    }

    // === Construction from pieces ===

    /// Concatenate MSB-first: the first operand lands in the highest
    /// bits. The result is unsigned, as concatenations always are.
    pub fn concat(parts: &[SvInt]) -> SvInt {
        let width: u32 = parts.iter().map(SvInt::width).sum();
        let mut out = SvInt::zero(width.max(1));
        let mut pos = width;
        for part in parts {
            pos -= part.width();
            for i in 0..part.width() {
                out.set_bit(pos + i, part.get_bit(i));
            }
        }
        out.renormalize();
        out
    }

    /// Replicate this value `count` times (MSB-first, like concat).
    pub fn replicate(&self, count: u32) -> SvInt {
        let parts: Vec<SvInt> = (0..count).map(|_| self.clone()).collect();
        SvInt::concat(&parts)
    }

    /// Parse a literal: `size` bits (or unsized), optional signedness,
    /// and base digits possibly containing `x`/`z`/`?` and `_`.
    /// Returns `None` on a digit invalid for the base.
    pub fn from_literal(
        size: Option<u32>,
        signed: bool,
        base: LiteralBase,
        digits: &str,
    ) -> Option<SvInt> {
        match base.bits_per_digit() {
            Some(bits_per) => Self::from_based_digits(size, signed, base, bits_per, digits),
            None => Self::from_decimal_digits(size, signed, digits),
        }
    }

    fn from_based_digits(
        size: Option<u32>,
        signed: bool,
        base: LiteralBase,
        bits_per: u32,
        digits: &str,
    ) -> Option<SvInt> {
        let mut bits: Vec<Logic> = Vec::new(); // MSB first
        for c in digits.chars() {
            if c == '_' {
                continue;
            }
            if let Some(l) = Logic::from_digit(c) {
                if l.is_unknown() {
                    for _ in 0..bits_per {
                        bits.push(l);
                    }
                    continue;
                }
            }
            let v = base.digit_value(c)?;
            for shift in (0..bits_per).rev() {
                bits.push(if (v >> shift) & 1 != 0 {
                    Logic::One
                } else {
                    Logic::Zero
                });
            }
        }
        if bits.is_empty() {
            return None;
        }

        let natural = bits.len() as u32;
        let width = size.unwrap_or_else(|| natural.max(Self::DEFAULT_WIDTH));
        let mut out = SvInt::zero(width).as_signed(signed);
        // Fill from the LSB; a sized literal narrower than its digits
        // truncates, wider extends with the top digit when unknown.
        for (i, bit) in bits.iter().rev().enumerate() {
            let i = i as u32;
            if i < width {
                out.set_bit(i, *bit);
            }
        }
        if width > natural && bits[0].is_unknown() {
            for i in natural..width {
                out.set_bit(i, bits[0]);
            }
        }
        out.renormalize();
        Some(out)
    }

    fn from_decimal_digits(size: Option<u32>, signed: bool, digits: &str) -> Option<SvInt> {
        let clean: Vec<char> = digits.chars().filter(|&c| c != '_').collect();
        // A decimal literal may be a single x/z digit, meaning all-X/Z.
        if let [c] = clean[..] {
            if let Some(l) = Logic::from_digit(c) {
                if l.is_unknown() {
                    let width = size.unwrap_or(Self::DEFAULT_WIDTH);
                    return Some(SvInt::filled(l, width, signed));
                }
            }
        }

        let mut words: Vec<u64> = vec![0];
        for c in clean {
            let d = LiteralBase::Decimal.digit_value(c)?;
            let mut carry = 0u128;
            for w in words.iter_mut() {
                let cur = (*w as u128) * 10 + carry;
                *w = cur as u64;
                carry = cur >> 64;
            }
            if carry != 0 {
                words.push(carry as u64);
            }
            let mut carry = d as u128;
            for w in words.iter_mut() {
                let cur = *w as u128 + carry;
                *w = cur as u64;
                carry = cur >> 64;
                if carry == 0 {
                    break;
                }
            }
            if carry != 0 {
                words.push(carry as u64);
            }
        }

        let top = 64 * words.len() as u32
            - words.last().map_or(64, |w| w.leading_zeros());
        let width = size.unwrap_or_else(|| top.max(Self::DEFAULT_WIDTH));
        Some(Self::with_planes(
            width,
            signed,
            Words::from_vec(words),
            SmallVec::new(),
        ))
    }
}

/// Binary long division on known value planes.
fn unsigned_div_rem(a: &[u64], b: &[u64], width: u32) -> (Words, Words) {
    let n = a.len();
    let mut quotient: Words = smallvec![0; n];
    let mut remainder: Words = smallvec![0; n];
    for i in (0..width).rev() {
        // remainder = (remainder << 1) | a[i]
        let mut carry = (a[i as usize / 64] >> (i % 64)) & 1;
        for w in remainder.iter_mut() {
            let new_carry = *w >> 63;
            *w = (*w << 1) | carry;
            carry = new_carry;
        }
        mask_words(&mut remainder, width);
        if words_ge(&remainder, b) {
            words_sub(&mut remainder, b);
            quotient[i as usize / 64] |= 1 << (i % 64);
        }
    }
    (quotient, remainder)
}

fn words_ge(a: &[u64], b: &[u64]) -> bool {
    for i in (0..a.len()).rev() {
        let bw = b.get(i).copied().unwrap_or(0);
        match a[i].cmp(&bw) {
            Ordering::Greater => return true,
            Ordering::Less => return false,
            Ordering::Equal => continue,
        }
    }
    true
}

fn words_sub(a: &mut [u64], b: &[u64]) {
    let mut borrow = 0u64;
    for i in 0..a.len() {
        let bw = b.get(i).copied().unwrap_or(0);
        let (d1, b1) = a[i].overflowing_sub(bw);
        let (d2, b2) = d1.overflowing_sub(borrow);
        a[i] = d2;
        borrow = u64::from(b1) + u64::from(b2);
    }
}

impl fmt::Display for SvInt {
    /// Renders as `width'[s]b...` binary when unknown bits are
    /// present, decimal otherwise.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.signed { "s" } else { "" };
        if self.has_unknown() {
            write!(f, "{}'{}b", self.width, sign)?;
            for i in (0..self.width).rev() {
                write!(f, "{}", self.get_bit(i))?;
            }
            return Ok(());
        }

        write!(f, "{}'{}d", self.width, sign)?;
        if self.is_negative() {
            write!(f, "-")?;
            return write_decimal(f, &self.negate().val);
        }
        write_decimal(f, &self.val)
    }
}

fn write_decimal(f: &mut fmt::Formatter<'_>, words: &[u64]) -> fmt::Result {
    let mut work: Vec<u64> = words.to_vec();
    let mut digits = Vec::new();
    loop {
        let mut rem = 0u128;
        let mut all_zero = true;
        for w in work.iter_mut().rev() {
            let cur = (rem << 64) | *w as u128;
            *w = (cur / 10) as u64;
            rem = cur % 10;
            if *w != 0 {
                all_zero = false;
            }
        }
        digits.push(b'0' + rem as u8);
        if all_zero {
            break;
        }
    }
    for d in digits.iter().rev() {
        write!(f, "{}", *d as char)?;
    }
    Ok(())
}

impl fmt::Debug for SvInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(v: u64, w: u32) -> SvInt {
        SvInt::from_u64(v, w, false)
    }

    fn sint(v: i64, w: u32) -> SvInt {
        SvInt::from_i64(v, w)
    }

    // === Construction and access ===

    #[test]
    fn bits_and_planes() {
        let v = SvInt::from_literal(Some(4), false, LiteralBase::Binary, "10xz").unwrap();
        assert_eq!(v.width(), 4);
        assert!(v.has_unknown());
        assert_eq!(v.get_bit(3), Logic::One);
        assert_eq!(v.get_bit(2), Logic::Zero);
        assert_eq!(v.get_bit(1), Logic::X);
        assert_eq!(v.get_bit(0), Logic::Z);
        assert_eq!(v.to_string(), "4'b10xz");
    }

    #[test]
    fn from_i64_negative() {
        let v = sint(-5, 8);
        assert!(v.is_negative());
        assert_eq!(v.as_i64(), Some(-5));
        assert_eq!(v.as_i32(), Some(-5));
        assert_eq!(v.as_u64(), None);
    }

    #[test]
    fn wide_values() {
        let v = int(u64::MAX, 100);
        let sum = v.add(&int(1, 100));
        assert_eq!(sum.get_bit(64), Logic::One);
        assert_eq!(sum.get_bit(0), Logic::Zero);
        assert_eq!(sum.as_u64(), None); // does not fit
    }

    // === Literals ===

    #[test]
    fn hex_literal() {
        let v = SvInt::from_literal(Some(16), false, LiteralBase::Hex, "dead").unwrap();
        assert_eq!(v.as_u64(), Some(0xdead));
    }

    #[test]
    fn decimal_literal_unsized_is_32_bits() {
        let v = SvInt::from_literal(None, true, LiteralBase::Decimal, "42").unwrap();
        assert_eq!(v.width(), 32);
        assert!(v.is_signed());
        assert_eq!(v.as_i32(), Some(42));
    }

    #[test]
    fn decimal_literal_grows_past_32_bits() {
        let v = SvInt::from_literal(None, false, LiteralBase::Decimal, "18446744073709551616")
            .unwrap(); // 2^64
        assert_eq!(v.width(), 65);
        assert_eq!(v.get_bit(64), Logic::One);
    }

    #[test]
    fn underscores_ignored() {
        let v = SvInt::from_literal(None, true, LiteralBase::Decimal, "1_000").unwrap();
        assert_eq!(v.as_i32(), Some(1000));
    }

    #[test]
    fn unknown_extension_of_sized_literal() {
        // 8'hx -> top digit unknown extends through the whole width
        let v = SvInt::from_literal(Some(8), false, LiteralBase::Hex, "x").unwrap();
        assert!((0..8).all(|i| v.get_bit(i) == Logic::X));
    }

    #[test]
    fn decimal_x_literal() {
        let v = SvInt::from_literal(Some(4), false, LiteralBase::Decimal, "z").unwrap();
        assert!((0..4).all(|i| v.get_bit(i) == Logic::Z));
    }

    #[test]
    fn invalid_digit_rejected() {
        assert!(SvInt::from_literal(None, false, LiteralBase::Binary, "102").is_none());
        assert!(SvInt::from_literal(None, false, LiteralBase::Octal, "8").is_none());
    }

    // === Arithmetic ===

    #[test]
    fn add_sub_mul() {
        assert_eq!(int(200, 8).add(&int(100, 8)).as_u64(), Some(44)); // wraps
        assert_eq!(sint(7, 32).sub(&sint(9, 32)).as_i32(), Some(-2));
        assert_eq!(int(1000, 32).mul(&int(1000, 32)).as_u64(), Some(1_000_000));
    }

    #[test]
    fn mixed_width_extends() {
        let a = int(255, 8);
        let b = int(1, 16);
        assert_eq!(a.add(&b).width(), 16);
        assert_eq!(a.add(&b).as_u64(), Some(256));
    }

    #[test]
    fn signed_division_truncates() {
        assert_eq!(sint(-7, 32).div(&sint(2, 32)).as_i32(), Some(-3));
        assert_eq!(sint(-7, 32).rem(&sint(2, 32)).as_i32(), Some(-1));
        assert_eq!(sint(7, 32).rem(&sint(-2, 32)).as_i32(), Some(1));
    }

    #[test]
    fn wide_division() {
        let a = int(u64::MAX, 128).mul(&int(3, 128));
        let (q, r) = a.div_rem(&int(3, 128));
        assert!(q.logical_eq(&int(u64::MAX, 128)) == Logic::One);
        assert!(r.is_zero());
    }

    #[test]
    fn division_by_zero_is_all_x() {
        let q = int(5, 8).div(&int(0, 8));
        assert!(q.has_unknown());
        assert!((0..8).all(|i| q.get_bit(i) == Logic::X));
        let r = int(5, 8).rem(&int(0, 8));
        assert!(r.has_unknown());
    }

    #[test]
    fn unknown_poisons_arithmetic() {
        let x = SvInt::from_literal(Some(8), false, LiteralBase::Binary, "1x").unwrap();
        let sum = x.add(&int(1, 8));
        assert!((0..8).all(|i| sum.get_bit(i) == Logic::X));
    }

    #[test]
    fn pow_cases() {
        assert_eq!(int(2, 32).pow(&int(10, 32)).as_u64(), Some(1024));
        assert_eq!(sint(-1, 32).pow(&sint(3, 32)).as_i32(), Some(-1));
        // negative exponent: |base| > 1 -> 0
        assert_eq!(sint(2, 32).pow(&sint(-1, 32)).as_i32(), Some(0));
        assert_eq!(sint(1, 32).pow(&sint(-5, 32)).as_i32(), Some(1));
        assert!(sint(0, 32).pow(&sint(-1, 32)).has_unknown());
    }

    // === Bitwise / shifts / reductions ===

    #[test]
    fn bitwise_tables() {
        let a = SvInt::from_literal(Some(4), false, LiteralBase::Binary, "01xz").unwrap();
        let b = SvInt::from_literal(Some(4), false, LiteralBase::Binary, "0000").unwrap();
        // 0 dominates AND even for x/z bits.
        assert!(a.and(&b).is_zero());
        let ones = SvInt::from_literal(Some(4), false, LiteralBase::Binary, "1111").unwrap();
        assert_eq!(a.or(&ones).to_string(), "4'd15");
    }

    #[test]
    fn shifts() {
        assert_eq!(int(0b0011, 8).shl(2).as_u64(), Some(0b1100));
        assert_eq!(int(0b1100, 8).lshr(2).as_u64(), Some(0b0011));
        let v = sint(-8, 8);
        assert_eq!(v.ashr(1).as_i64(), Some(-4));
        assert_eq!(v.ashr(10).as_i64(), Some(-1)); // saturates to sign
    }

    #[test]
    fn reductions() {
        assert_eq!(int(0b1111, 4).reduction_and(), Logic::One);
        assert_eq!(int(0b1110, 4).reduction_and(), Logic::Zero);
        assert_eq!(int(0, 4).reduction_or(), Logic::Zero);
        assert_eq!(int(0b0110, 4).reduction_xor(), Logic::Zero);
        assert_eq!(int(0b0111, 4).reduction_xor(), Logic::One);
    }

    // === Equality flavors ===

    #[test]
    fn logical_eq_poisoned_by_unknowns() {
        let x = SvInt::from_literal(Some(4), false, LiteralBase::Binary, "1x00").unwrap();
        assert_eq!(x.logical_eq(&x.clone()), Logic::X);
        assert_eq!(int(5, 8).logical_eq(&int(5, 16)), Logic::One);
        assert_eq!(int(5, 8).logical_eq(&int(6, 8)), Logic::Zero);
    }

    #[test]
    fn case_eq_is_exact() {
        let a = SvInt::from_literal(Some(4), false, LiteralBase::Binary, "1x0z").unwrap();
        let b = SvInt::from_literal(Some(4), false, LiteralBase::Binary, "1x0z").unwrap();
        let c = SvInt::from_literal(Some(4), false, LiteralBase::Binary, "1z0z").unwrap();
        assert!(a.case_eq(&b));
        assert!(!a.case_eq(&c));
        // `===` agrees with bit equality, per the defining law.
        assert_eq!(a.case_eq(&b), (0..4).all(|i| a.get_bit(i) == b.get_bit(i)));
    }

    // === Comparison ===

    #[test]
    fn signed_vs_unsigned_comparison() {
        // Both signed: -1 < 1.
        assert_eq!(sint(-1, 8).less_than(&sint(1, 8)), Logic::One);
        // Mixed signedness compares unsigned: 255 > 1.
        let a = sint(-1, 8).as_signed(false);
        assert_eq!(a.less_than(&int(1, 8)), Logic::Zero);
        let x = SvInt::all_x(8);
        assert_eq!(x.less_than(&int(1, 8)), Logic::X);
    }

    // === Resize ===

    #[test]
    fn resize_sign_and_zero_extension() {
        assert_eq!(sint(-2, 4).resize(8).as_i64(), Some(-2));
        assert_eq!(int(0b1110, 4).resize(8).as_u64(), Some(0b1110));
        assert_eq!(int(0x1ff, 16).resize(4).as_u64(), Some(0xf));
    }

    #[test]
    fn resize_extends_unknown_sign_bit() {
        let v = SvInt::from_literal(Some(2), true, LiteralBase::Binary, "x0").unwrap();
        let wide = v.resize(4);
        assert_eq!(wide.get_bit(3), Logic::X);
        assert_eq!(wide.get_bit(2), Logic::X);
        assert_eq!(wide.get_bit(0), Logic::Zero);
    }

    // === Concat / replicate ===

    #[test]
    fn concat_is_msb_first() {
        let v = SvInt::concat(&[int(0b10, 2), int(0b01, 2)]);
        assert_eq!(v.width(), 4);
        assert_eq!(v.as_u64(), Some(0b1001));
        assert!(!v.is_signed());
    }

    #[test]
    fn replicate() {
        let v = int(0b01, 2).replicate(3);
        assert_eq!(v.width(), 6);
        assert_eq!(v.as_u64(), Some(0b010101));
    }

    // === Truthiness ===

    #[test]
    fn to_logic_rules() {
        assert_eq!(int(0, 8).to_logic(), Logic::Zero);
        assert_eq!(int(4, 8).to_logic(), Logic::One);
        assert_eq!(SvInt::all_x(8).to_logic(), Logic::X);
        // A known 1 bit wins over unknowns elsewhere.
        let v = SvInt::from_literal(Some(4), false, LiteralBase::Binary, "1xxx").unwrap();
        assert_eq!(v.to_logic(), Logic::One);
    }

    // === Display ===

    #[test]
    fn display_forms() {
        assert_eq!(int(255, 8).to_string(), "8'd255");
        assert_eq!(sint(-1, 8).to_string(), "8'sd-1");
        assert_eq!(SvInt::all_z(2).to_string(), "2'bzz");
    }
}
