#[cfg(test)]
pub mod test;

/// Element type carried by a tensor shape.
///
/// `Prng` marks the opaque state produced by `prng_step`; it never
/// participates in arithmetic promotion. `Invalid` is the promotion seed and
/// the type of default-constructed shapes.
#[derive(Debug, Default, Hash)]
#[derive(strum::EnumCount, strum::EnumIter, strum::FromRepr)]
#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "proptest", derive(proptest_derive::Arbitrary))]
pub enum DataType {
    #[default]
    Invalid = 0,

    Boolean = 1,

    Int16 = 2,
    Int32 = 3,
    Int64 = 4,

    UInt16 = 5,
    UInt32 = 6,
    UInt64 = 7,

    Float16 = 8,
    Float32 = 9,
    Float64 = 10,

    /// Opaque pseudo-random generator state.
    Prng = 11,
}

impl DataType {
    pub const fn is_float(&self) -> bool {
        matches!(self, Self::Float16 | Self::Float32 | Self::Float64)
    }

    pub const fn is_int(&self) -> bool {
        matches!(self, Self::Int16 | Self::Int32 | Self::Int64)
    }

    pub const fn is_uint(&self) -> bool {
        matches!(self, Self::UInt16 | Self::UInt32 | Self::UInt64)
    }

    /// Width in bits as used by arithmetic promotion.
    ///
    /// `Invalid` and `Prng` report 0 so they lose against every real type.
    pub const fn bit_width(&self) -> usize {
        match self {
            Self::Invalid | Self::Prng => 0,
            Self::Boolean => 8,
            Self::Int16 | Self::UInt16 | Self::Float16 => 16,
            Self::Int32 | Self::UInt32 | Self::Float32 => 32,
            Self::Int64 | Self::UInt64 | Self::Float64 => 64,
        }
    }

    pub const fn bytes(&self) -> usize {
        self.bit_width() / 8
    }
}
