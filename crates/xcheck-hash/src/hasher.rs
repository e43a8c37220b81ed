//! Built-in fingerprint hashers.
//!
//! Records are hashed in two stages: each field fingerprint goes through a
//! "simple" hasher and the result is folded into an "aggregate" hasher.
//! Both stages are selectable by name per struct or per function.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Mixing constant for jodyhash.
pub const JODY_HASH_CONSTANT: u64 = 0x1f3d_5b79;
/// Rotation amount for jodyhash.
pub const JODY_HASH_SHIFT: u32 = 14;

/// Incremental 64-bit fingerprint hasher.
pub trait FingerprintHasher {
    /// Mix one 64-bit word into the state.
    fn write_u64(&mut self, value: u64);
    /// Current fingerprint.
    fn finish(&self) -> u64;
}

/// XOR-fold hasher. Order-insensitive, used for leaves and field stages.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SimpleHasher(u64);

impl SimpleHasher {
    #[must_use]
    pub const fn with_seed(seed: u64) -> Self {
        Self(seed)
    }
}

impl FingerprintHasher for SimpleHasher {
    fn write_u64(&mut self, value: u64) {
        self.0 ^= value;
    }

    fn finish(&self) -> u64 {
        self.0
    }
}

/// jodyhash over 64-bit words. Order-sensitive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct JodyHasher(u64);

impl FingerprintHasher for JodyHasher {
    fn write_u64(&mut self, value: u64) {
        let mut h = self.0.wrapping_add(value).wrapping_add(JODY_HASH_CONSTANT);
        h = h.rotate_left(JODY_HASH_SHIFT);
        h ^= value;
        h = h.rotate_left(JODY_HASH_SHIFT);
        h ^= JODY_HASH_CONSTANT;
        self.0 = h.wrapping_add(value);
    }

    fn finish(&self) -> u64 {
        self.0
    }
}

/// Selectable hasher family.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum HasherKind {
    #[default]
    Jodyhash,
    Simple,
}

impl HasherKind {
    pub const ALL: [Self; 2] = [Self::Jodyhash, Self::Simple];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Jodyhash => "jodyhash",
            Self::Simple => "simple",
        }
    }

    /// Fresh hasher state for this family.
    #[must_use]
    pub fn start(self) -> AnyHasher {
        match self {
            Self::Jodyhash => AnyHasher::Jody(JodyHasher::default()),
            Self::Simple => AnyHasher::Simple(SimpleHasher::default()),
        }
    }

    /// Hash a sequence of words from a fresh state.
    pub fn fold(self, values: impl IntoIterator<Item = u64>) -> u64 {
        let mut h = self.start();
        for v in values {
            h.write_u64(v);
        }
        h.finish()
    }
}

impl fmt::Display for HasherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown hasher `{0}`")]
pub struct UnknownHasher(pub String);

impl FromStr for HasherKind {
    type Err = UnknownHasher;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| UnknownHasher(s.to_string()))
    }
}

/// Hasher state of any built-in family.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnyHasher {
    Jody(JodyHasher),
    Simple(SimpleHasher),
}

impl FingerprintHasher for AnyHasher {
    fn write_u64(&mut self, value: u64) {
        match self {
            Self::Jody(h) => h.write_u64(value),
            Self::Simple(h) => h.write_u64(value),
        }
    }

    fn finish(&self) -> u64 {
        match self {
            Self::Jody(h) => h.finish(),
            Self::Simple(h) => h.finish(),
        }
    }
}

/// Aggregate/simple hasher pair used to fold record fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HasherPair {
    pub aggregate: HasherKind,
    pub simple: HasherKind,
}

impl HasherPair {
    pub const BUILTIN: Self = Self {
        aggregate: HasherKind::Jodyhash,
        simple: HasherKind::Simple,
    };

    #[must_use]
    pub fn is_builtin(self) -> bool {
        self == Self::BUILTIN
    }

    /// Fold field fingerprints: each passes through the simple stage,
    /// then into the aggregate stage, in order.
    pub fn fold_fields(self, fields: impl IntoIterator<Item = u64>) -> u64 {
        let mut agg = self.aggregate.start();
        for v in fields {
            agg.write_u64(self.simple.fold([v]));
        }
        agg.finish()
    }
}

impl Default for HasherPair {
    fn default() -> Self {
        Self::BUILTIN
    }
}
