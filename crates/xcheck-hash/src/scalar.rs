//! Scalar leaf fingerprints.
//!
//! A scalar fingerprint is `tag(kind) * TYPE_TAG_STEP` XORed with the
//! value's canonical 64-bit pattern: integers are sign- or zero-extended
//! according to their signedness, booleans are 0/1 and floating point
//! values contribute their IEEE bits, so `-0.0` and `0.0` differ and every
//! NaN payload is kept.

use std::fmt;

use crate::hasher::{FingerprintHasher, SimpleHasher};

/// Multiplier spreading type tags across all bytes of the seed.
pub const TYPE_TAG_STEP: u64 = 0x5a5a_5a5a_5a5a_5a5a;

/// Primitive value types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScalarKind {
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    Bool,
    F32,
    F64,
}

impl ScalarKind {
    pub const ALL: [Self; 11] = [
        Self::U8,
        Self::U16,
        Self::U32,
        Self::U64,
        Self::I8,
        Self::I16,
        Self::I32,
        Self::I64,
        Self::Bool,
        Self::F32,
        Self::F64,
    ];

    /// Type tag mixed into the seed. Gaps are reserved for 128-bit
    /// integers and `char`.
    #[must_use]
    pub const fn type_tag(self) -> u64 {
        match self {
            Self::U8 => 0,
            Self::U16 => 1,
            Self::U32 => 2,
            Self::U64 => 3,
            Self::I8 => 5,
            Self::I16 => 6,
            Self::I32 => 7,
            Self::I64 => 8,
            Self::Bool => 10,
            Self::F32 => 12,
            Self::F64 => 13,
        }
    }

    /// Seed of the leaf hasher for this type.
    #[must_use]
    pub const fn seed(self) -> u64 {
        self.type_tag().wrapping_mul(TYPE_TAG_STEP)
    }

    /// C spelling of the type.
    #[must_use]
    pub const fn c_name(self) -> &'static str {
        match self {
            Self::U8 => "uint8_t",
            Self::U16 => "uint16_t",
            Self::U32 => "uint32_t",
            Self::U64 => "uint64_t",
            Self::I8 => "int8_t",
            Self::I16 => "int16_t",
            Self::I32 => "int32_t",
            Self::I64 => "int64_t",
            Self::Bool => "_Bool",
            Self::F32 => "float",
            Self::F64 => "double",
        }
    }

    /// Identifier-safe name, used in composed routine names.
    #[must_use]
    pub const fn ident(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            other => other.c_name(),
        }
    }

    #[must_use]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }

    #[must_use]
    pub const fn is_signed(self) -> bool {
        matches!(self, Self::I8 | Self::I16 | Self::I32 | Self::I64)
    }

    /// Width in bytes.
    #[must_use]
    pub const fn width(self) -> u8 {
        match self {
            Self::U8 | Self::I8 | Self::Bool => 1,
            Self::U16 | Self::I16 => 2,
            Self::U32 | Self::I32 | Self::F32 => 4,
            Self::U64 | Self::I64 | Self::F64 => 8,
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.c_name())
    }
}

/// A concrete primitive value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ScalarValue {
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    Bool(bool),
    F32(f32),
    F64(f64),
}

impl ScalarValue {
    #[must_use]
    pub const fn kind(self) -> ScalarKind {
        match self {
            Self::U8(_) => ScalarKind::U8,
            Self::U16(_) => ScalarKind::U16,
            Self::U32(_) => ScalarKind::U32,
            Self::U64(_) => ScalarKind::U64,
            Self::I8(_) => ScalarKind::I8,
            Self::I16(_) => ScalarKind::I16,
            Self::I32(_) => ScalarKind::I32,
            Self::I64(_) => ScalarKind::I64,
            Self::Bool(_) => ScalarKind::Bool,
            Self::F32(_) => ScalarKind::F32,
            Self::F64(_) => ScalarKind::F64,
        }
    }

    /// Canonical 64-bit pattern of the value.
    #[must_use]
    #[allow(clippy::cast_sign_loss, clippy::cast_lossless)]
    pub const fn bits(self) -> u64 {
        match self {
            Self::U8(v) => v as u64,
            Self::U16(v) => v as u64,
            Self::U32(v) => v as u64,
            Self::U64(v) => v,
            Self::I8(v) => v as u64,
            Self::I16(v) => v as u64,
            Self::I32(v) => v as u64,
            Self::I64(v) => v as u64,
            Self::Bool(v) => v as u64,
            Self::F32(v) => v.to_bits() as u64,
            Self::F64(v) => v.to_bits(),
        }
    }
}

/// Fingerprint of a scalar given its type and canonical bits.
#[must_use]
pub fn hash_scalar_bits(kind: ScalarKind, bits: u64) -> u64 {
    let mut h = SimpleHasher::with_seed(kind.seed());
    h.write_u64(bits);
    h.finish()
}

/// Fingerprint of a scalar value.
#[must_use]
pub fn hash_scalar(value: ScalarValue) -> u64 {
    hash_scalar_bits(value.kind(), value.bits())
}
