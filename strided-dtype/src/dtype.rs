//! The dtype registry: tags, byte widths and category predicates.

use std::fmt;
use std::ops::BitOr;
use std::str::FromStr;

use crate::DTypeError;

/// Element data type of a buffer.
///
/// The string form of each variant is the lowercase tag accepted by
/// [`FromStr`] and written by [`Display`](fmt::Display).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DType {
    Int8,
    Uint8,
    /// Unsigned 8-bit integer with clamped (saturating, rounding) assignment.
    Uint8c,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Float32,
    Float64,
    /// Single-precision complex (two `f32`).
    Complex64,
    /// Double-precision complex (two `f64`).
    Complex128,
    Bool,
    /// Boxed dynamic values ([`Scalar`](crate::Scalar)).
    Generic,
    /// Raw bytes.
    Binary,
}

/// Storage width of one element.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ByteWidth {
    Fixed(usize),
    /// Opaque or per-element sized (`generic`, `binary`).
    Variable,
}

/// A dtype category.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Category {
    Integer = 1 << 0,
    FloatingPoint = 1 << 1,
    Real = 1 << 2,
    Signed = 1 << 3,
    Unsigned = 1 << 4,
    Complex = 1 << 5,
    Boolean = 1 << 6,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Integer,
        Category::FloatingPoint,
        Category::Real,
        Category::Signed,
        Category::Unsigned,
        Category::Complex,
        Category::Boolean,
    ];

    #[inline]
    const fn bit(self) -> u8 {
        self as u8
    }
}

/// Set of [`Category`] values, stored as a bitset.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct Categories(u8);

impl Categories {
    pub const EMPTY: Categories = Categories(0);

    const INTEGER_SIGNED: Categories = Categories(
        Category::Integer.bit() | Category::Real.bit() | Category::Signed.bit(),
    );
    const INTEGER_UNSIGNED: Categories = Categories(
        Category::Integer.bit() | Category::Real.bit() | Category::Unsigned.bit(),
    );
    const FLOAT_REAL: Categories = Categories(
        Category::FloatingPoint.bit() | Category::Real.bit() | Category::Signed.bit(),
    );
    const FLOAT_COMPLEX: Categories = Categories(
        Category::FloatingPoint.bit() | Category::Complex.bit() | Category::Signed.bit(),
    );
    const BOOLEAN: Categories = Categories(Category::Boolean.bit());

    #[inline]
    pub fn contains(self, category: Category) -> bool {
        self.0 & category.bit() != 0
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn iter(self) -> impl Iterator<Item = Category> {
        Category::ALL.into_iter().filter(move |&c| self.contains(c))
    }
}

impl From<Category> for Categories {
    fn from(c: Category) -> Self {
        Categories(c.bit())
    }
}

impl BitOr for Categories {
    type Output = Categories;

    fn bitor(self, rhs: Self) -> Self::Output {
        Categories(self.0 | rhs.0)
    }
}

impl BitOr<Category> for Categories {
    type Output = Categories;

    fn bitor(self, rhs: Category) -> Self::Output {
        Categories(self.0 | rhs.bit())
    }
}

impl fmt::Debug for Categories {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl DType {
    /// All dtypes in registry order.
    pub const ALL: [DType; 14] = [
        DType::Int8,
        DType::Uint8,
        DType::Uint8c,
        DType::Int16,
        DType::Uint16,
        DType::Int32,
        DType::Uint32,
        DType::Float32,
        DType::Float64,
        DType::Complex64,
        DType::Complex128,
        DType::Bool,
        DType::Generic,
        DType::Binary,
    ];

    /// The lowercase string tag.
    pub const fn as_str(self) -> &'static str {
        match self {
            DType::Int8 => "int8",
            DType::Uint8 => "uint8",
            DType::Uint8c => "uint8c",
            DType::Int16 => "int16",
            DType::Uint16 => "uint16",
            DType::Int32 => "int32",
            DType::Uint32 => "uint32",
            DType::Float32 => "float32",
            DType::Float64 => "float64",
            DType::Complex64 => "complex64",
            DType::Complex128 => "complex128",
            DType::Bool => "bool",
            DType::Generic => "generic",
            DType::Binary => "binary",
        }
    }

    pub const fn byte_width(self) -> ByteWidth {
        match self {
            DType::Int8 | DType::Uint8 | DType::Uint8c | DType::Bool => ByteWidth::Fixed(1),
            DType::Int16 | DType::Uint16 => ByteWidth::Fixed(2),
            DType::Int32 | DType::Uint32 | DType::Float32 => ByteWidth::Fixed(4),
            DType::Float64 | DType::Complex64 => ByteWidth::Fixed(8),
            DType::Complex128 => ByteWidth::Fixed(16),
            DType::Generic | DType::Binary => ByteWidth::Variable,
        }
    }

    pub const fn categories(self) -> Categories {
        match self {
            DType::Int8 | DType::Int16 | DType::Int32 => Categories::INTEGER_SIGNED,
            DType::Uint8 | DType::Uint8c | DType::Uint16 | DType::Uint32 => {
                Categories::INTEGER_UNSIGNED
            }
            DType::Float32 | DType::Float64 => Categories::FLOAT_REAL,
            DType::Complex64 | DType::Complex128 => Categories::FLOAT_COMPLEX,
            DType::Bool => Categories::BOOLEAN,
            DType::Generic | DType::Binary => Categories::EMPTY,
        }
    }

    /// Real and complex floating-point types.
    #[inline]
    pub fn is_floating_point(self) -> bool {
        self.categories().contains(Category::FloatingPoint)
    }

    #[inline]
    pub fn is_integer(self) -> bool {
        self.categories().contains(Category::Integer)
    }

    #[inline]
    pub fn is_signed_integer(self) -> bool {
        let c = self.categories();
        c.contains(Category::Integer) && c.contains(Category::Signed)
    }

    #[inline]
    pub fn is_unsigned_integer(self) -> bool {
        let c = self.categories();
        c.contains(Category::Integer) && c.contains(Category::Unsigned)
    }

    #[inline]
    pub fn is_real(self) -> bool {
        self.categories().contains(Category::Real)
    }

    #[inline]
    pub fn is_complex(self) -> bool {
        self.categories().contains(Category::Complex)
    }

    #[inline]
    pub fn is_boolean(self) -> bool {
        self.categories().contains(Category::Boolean)
    }

    /// Integer, real floating-point, or complex.
    #[inline]
    pub fn is_numeric(self) -> bool {
        let c = self.categories();
        c.contains(Category::Integer) || c.contains(Category::FloatingPoint)
    }
}

impl FromStr for DType {
    type Err = DTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DType::ALL
            .iter()
            .copied()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| DTypeError::Unknown(s.to_string()))
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Tag-level lookups
// ============================================================================

/// Categories of a dtype tag; empty for unrecognized tags.
pub fn categories_of(tag: &str) -> Categories {
    tag.parse::<DType>()
        .map(DType::categories)
        .unwrap_or(Categories::EMPTY)
}

/// Byte width of a dtype tag, or `None` for unrecognized tags.
pub fn byte_width_of(tag: &str) -> Option<ByteWidth> {
    tag.parse::<DType>().ok().map(DType::byte_width)
}

macro_rules! tag_predicate {
    ($(#[$doc:meta])* $name:ident => $method:ident) => {
        $(#[$doc])*
        pub fn $name(tag: &str) -> bool {
            tag.parse::<DType>().map(DType::$method).unwrap_or(false)
        }
    };
}

tag_predicate!(
    /// `false` for unrecognized tags, as are all tag predicates.
    is_floating_point_dtype => is_floating_point
);
tag_predicate!(is_integer_dtype => is_integer);
tag_predicate!(is_signed_integer_dtype => is_signed_integer);
tag_predicate!(is_unsigned_integer_dtype => is_unsigned_integer);
tag_predicate!(is_real_dtype => is_real);
tag_predicate!(is_complex_dtype => is_complex);
tag_predicate!(is_boolean_dtype => is_boolean);
tag_predicate!(is_numeric_dtype => is_numeric);
