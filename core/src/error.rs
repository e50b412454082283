//! Errors arising when reading and writing npy files.

use std::{fmt, io};

use crate::{
    array::Shape,
    element::{ElementType, Endian},
};

/// A specialised result type for npy operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// An error associated with reading or writing an npy file.
#[derive(Debug)]
pub enum Error {
    /// The input does not start with the npy magic number.
    BadMagic,
    /// The header is not a valid npy header.
    MalformedHeader(String),
    /// The type descriptor names an element type that is not supported.
    UnsupportedElementType(String),
    /// The header dictionary does not fit the length field of the header.
    HeaderTooLarge {
        /// Length of the padded header dictionary in bytes.
        len: usize,
    },
    /// Appending would require the header to grow past its reserved length.
    HeaderGrowthUnsupported {
        /// Length of the existing header in bytes.
        reserved: usize,
        /// Length required by the rewritten header in bytes.
        required: usize,
    },
    /// The array to append is incompatible with the existing array.
    IncompatibleAppend(AppendMismatch),
    /// The data ends before the number of bytes declared by the header.
    TruncatedData {
        /// Number of data bytes declared by the header.
        expected: usize,
        /// Number of data bytes available.
        found: usize,
    },
    /// An array holds fewer elements than requested.
    ElementCountMismatch {
        /// Number of elements requested.
        requested: usize,
        /// Number of elements available.
        available: usize,
    },
    /// The number of elements in a buffer does not fit the shape it is saved with.
    ShapeMismatch {
        /// Shape the buffer was saved with.
        shape: Shape,
        /// Number of elements in the buffer.
        elements: usize,
    },
    /// A typed view was requested for a different element type than the buffer holds.
    ElementTypeMismatch {
        /// Element type of the requested view.
        expected: ElementType,
        /// Element type of the buffer.
        found: ElementType,
    },
    /// An underlying I/O error.
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BadMagic => f.write_str("invalid npy magic number"),
            Error::MalformedHeader(reason) => write!(f, "malformed npy header: {reason}"),
            Error::UnsupportedElementType(descr) => {
                write!(f, "unsupported npy element type '{descr}'")
            }
            Error::HeaderTooLarge { len } => {
                write!(f, "npy header of {len} bytes does not fit header length field")
            }
            Error::HeaderGrowthUnsupported { reserved, required } => write!(
                f,
                "appending requires a header of {required} bytes, \
                but only {reserved} bytes are reserved in existing npy file"
            ),
            Error::IncompatibleAppend(mismatch) => {
                write!(f, "cannot append to existing npy file: {mismatch}")
            }
            Error::TruncatedData { expected, found } => write!(
                f,
                "npy data truncated: header declares {expected} bytes, found {found} bytes"
            ),
            Error::ElementCountMismatch {
                requested,
                available,
            } => write!(
                f,
                "requested {requested} elements, but npy array only holds {available} elements"
            ),
            Error::ShapeMismatch { shape, elements } => write!(
                f,
                "buffer with {elements} elements does not fit shape {shape}"
            ),
            Error::ElementTypeMismatch { expected, found } => write!(
                f,
                "cannot view elements of type {found} as elements of type {expected}"
            ),
            Error::Io(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<AppendMismatch> for Error {
    fn from(mismatch: AppendMismatch) -> Self {
        Self::IncompatibleAppend(mismatch)
    }
}

/// The reason an array cannot be appended to an existing array.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AppendMismatch {
    /// The existing array is stored in Fortran order.
    FortranOrder,
    /// Element widths differ.
    Width {
        /// Width of existing elements in bytes.
        existing: usize,
        /// Width of appended elements in bytes.
        new: usize,
    },
    /// Byte orders of multi-byte elements differ.
    ByteOrder {
        /// Byte order of existing elements.
        existing: Endian,
        /// Byte order of appended elements.
        new: Endian,
    },
    /// Number of dimensions differ.
    Rank {
        /// Number of dimensions of the existing array.
        existing: usize,
        /// Number of dimensions of the appended array.
        new: usize,
    },
    /// Scalars have no leading axis to append along.
    Scalar,
    /// A non-leading dimension differs.
    Dimension {
        /// Axis of the differing dimension.
        axis: usize,
        /// Size of the existing dimension.
        existing: usize,
        /// Size of the appended dimension.
        new: usize,
    },
    /// The merged leading dimension does not fit in a `usize`.
    LeadingOverflow {
        /// Size of the existing leading dimension.
        existing: usize,
        /// Size of the appended leading dimension.
        new: usize,
    },
}

impl fmt::Display for AppendMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppendMismatch::FortranOrder => f.write_str("existing array is in Fortran order"),
            AppendMismatch::Width { existing, new } => write!(
                f,
                "existing elements have width {existing}, appended elements have width {new}"
            ),
            AppendMismatch::ByteOrder { existing, new } => write!(
                f,
                "existing elements are {existing}, appended elements are {new}"
            ),
            AppendMismatch::Rank { existing, new } => write!(
                f,
                "existing array has {existing} dimensions, appended array has {new} dimensions"
            ),
            AppendMismatch::Scalar => f.write_str("cannot append to scalar array"),
            AppendMismatch::Dimension {
                axis,
                existing,
                new,
            } => write!(
                f,
                "dimension {axis} has size {existing} in existing array and {new} in appended array"
            ),
            AppendMismatch::LeadingOverflow { existing, new } => write!(
                f,
                "leading dimension of size {existing} cannot grow by {new} elements"
            ),
        }
    }
}
