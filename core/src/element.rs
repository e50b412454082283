//! Element types and the npy type descriptor.

use std::{fmt, str::FromStr};

pub use half::f16;

use crate::error::Error;

/// The byte order of elements.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Endian {
    /// Little-endian, encoded as `<`.
    Little,
    /// Big-endian, encoded as `>`.
    Big,
    /// Byte order is irrelevant, as for single bytes and byte strings; encoded as `|`.
    NotApplicable,
}

impl Endian {
    /// Returns the byte order of the current platform.
    pub fn native() -> Self {
        if cfg!(target_endian = "big") {
            Endian::Big
        } else {
            Endian::Little
        }
    }

    /// Returns the character encoding the byte order in a type descriptor.
    pub fn as_char(self) -> char {
        match self {
            Endian::Little => '<',
            Endian::Big => '>',
            Endian::NotApplicable => '|',
        }
    }

    /// Returns the byte order encoded by a type descriptor character.
    ///
    /// The native byte order character `=` is resolved to the byte order of the current
    /// platform.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '<' => Some(Endian::Little),
            '>' => Some(Endian::Big),
            '|' => Some(Endian::NotApplicable),
            '=' => Some(Endian::native()),
            _ => None,
        }
    }
}

impl fmt::Display for Endian {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Endian::Little => "little-endian",
            Endian::Big => "big-endian",
            Endian::NotApplicable => "byte order independent",
        })
    }
}

/// A supported element type.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ElementType {
    /// Signed 8-bit integer.
    I1,
    /// Signed 16-bit integer.
    I2,
    /// Signed 32-bit integer.
    I4,
    /// Signed 64-bit integer.
    I8,
    /// Unsigned 8-bit integer.
    U1,
    /// Unsigned 16-bit integer.
    U2,
    /// Unsigned 32-bit integer.
    U4,
    /// Unsigned 64-bit integer.
    U8,
    /// Half-precision float.
    F2,
    /// Single-precision float.
    F4,
    /// Double-precision float.
    F8,
    /// Fixed-length byte string of the given, non-zero width.
    Bytes(usize),
}

impl ElementType {
    /// Returns the element type with the given kind code and width, if supported.
    pub fn from_kind_and_width(kind: char, width: usize) -> Option<Self> {
        Some(match (kind, width) {
            ('i', 1) => ElementType::I1,
            ('i', 2) => ElementType::I2,
            ('i', 4) => ElementType::I4,
            ('i', 8) => ElementType::I8,
            ('u', 1) => ElementType::U1,
            ('u', 2) => ElementType::U2,
            ('u', 4) => ElementType::U4,
            ('u', 8) => ElementType::U8,
            ('f', 2) => ElementType::F2,
            ('f', 4) => ElementType::F4,
            ('f', 8) => ElementType::F8,
            ('S', n) if n > 0 => ElementType::Bytes(n),
            _ => return None,
        })
    }

    /// Returns the one-character kind code.
    pub fn kind(&self) -> char {
        match self {
            ElementType::I1 | ElementType::I2 | ElementType::I4 | ElementType::I8 => 'i',
            ElementType::U1 | ElementType::U2 | ElementType::U4 | ElementType::U8 => 'u',
            ElementType::F2 | ElementType::F4 | ElementType::F8 => 'f',
            ElementType::Bytes(_) => 'S',
        }
    }

    /// Returns the width of a single element in bytes.
    pub fn width(&self) -> usize {
        match self {
            ElementType::I1 | ElementType::U1 => 1,
            ElementType::I2 | ElementType::U2 | ElementType::F2 => 2,
            ElementType::I4 | ElementType::U4 | ElementType::F4 => 4,
            ElementType::I8 | ElementType::U8 | ElementType::F8 => 8,
            ElementType::Bytes(n) => *n,
        }
    }

    /// Returns `true` if the byte order of elements matters.
    pub fn has_byte_order(&self) -> bool {
        !matches!(self, ElementType::Bytes(_)) && self.width() > 1
    }

    pub(crate) fn validate(self) -> Result<Self, Error> {
        Self::from_kind_and_width(self.kind(), self.width())
            .ok_or_else(|| Error::UnsupportedElementType(self.to_string()))
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind(), self.width())
    }
}

/// A type descriptor, combining an element type with the byte order of its elements.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct TypeDescriptor {
    /// Byte order of elements.
    pub endian: Endian,
    /// Element type.
    pub element_type: ElementType,
}

impl TypeDescriptor {
    /// Creates a new type descriptor.
    ///
    /// Element types without byte order always use [`Endian::NotApplicable`], while element
    /// types with byte order given [`Endian::NotApplicable`] use the native byte order.
    pub fn new(endian: Endian, element_type: ElementType) -> Self {
        let endian = match (element_type.has_byte_order(), endian) {
            (false, _) => Endian::NotApplicable,
            (true, Endian::NotApplicable) => Endian::native(),
            (true, endian) => endian,
        };

        Self {
            endian,
            element_type,
        }
    }

    /// Creates a new type descriptor using the byte order of the current platform.
    pub fn native(element_type: ElementType) -> Self {
        Self::new(Endian::native(), element_type)
    }

    pub(crate) fn validate(self) -> Result<Self, Error> {
        let element_type = self.element_type.validate()?;

        match (self.endian, element_type.has_byte_order()) {
            (Endian::NotApplicable, true) | (Endian::Little | Endian::Big, false) => {
                Err(Error::UnsupportedElementType(self.to_string()))
            }
            _ => Ok(self),
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.endian.as_char(), self.element_type)
    }
}

impl FromStr for TypeDescriptor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unsupported = || Error::UnsupportedElementType(String::from(s));

        let mut chars = s.chars();
        let endian = chars.next().and_then(Endian::from_char).ok_or_else(unsupported)?;
        let kind = chars.next().ok_or_else(unsupported)?;
        let width = chars.as_str().parse::<usize>().map_err(|_| unsupported())?;

        let element_type = ElementType::from_kind_and_width(kind, width).ok_or_else(unsupported)?;

        match (endian, element_type.has_byte_order()) {
            (Endian::NotApplicable, true) => Err(unsupported()),
            _ => Ok(Self::new(endian, element_type)),
        }
    }
}

/// A numeric type that can be read from and written to npy element bytes.
pub trait Element: Copy {
    /// The element type of the implementor.
    const ELEMENT_TYPE: ElementType;

    /// Decodes an element from exactly [`ElementType::width`] bytes.
    fn from_bytes(bytes: &[u8], endian: Endian) -> Self;

    /// Encodes the element, appending its bytes to `dest`.
    fn extend_bytes(self, endian: Endian, dest: &mut Vec<u8>);
}

macro_rules! impl_element {
    ($ty:ty, $variant:ident) => {
        impl Element for $ty {
            const ELEMENT_TYPE: ElementType = ElementType::$variant;

            fn from_bytes(bytes: &[u8], endian: Endian) -> Self {
                let mut buf = [0; std::mem::size_of::<$ty>()];
                buf.copy_from_slice(bytes);

                match endian {
                    Endian::Little => <$ty>::from_le_bytes(buf),
                    Endian::Big => <$ty>::from_be_bytes(buf),
                    Endian::NotApplicable => <$ty>::from_ne_bytes(buf),
                }
            }

            fn extend_bytes(self, endian: Endian, dest: &mut Vec<u8>) {
                let buf = match endian {
                    Endian::Little => self.to_le_bytes(),
                    Endian::Big => self.to_be_bytes(),
                    Endian::NotApplicable => self.to_ne_bytes(),
                };

                dest.extend_from_slice(&buf);
            }
        }
    };
}

impl_element!(i8, I1);
impl_element!(i16, I2);
impl_element!(i32, I4);
impl_element!(i64, I8);
impl_element!(u8, U1);
impl_element!(u16, U2);
impl_element!(u32, U4);
impl_element!(u64, U8);
impl_element!(f16, F2);
impl_element!(f32, F4);
impl_element!(f64, F8);
