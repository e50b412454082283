//! Building and parsing the npy header.
//!
//! The header consists of a fixed preamble followed by a textual dictionary:
//!
//! ```text
//! \x93NUMPY <major> <minor> <len> {'descr': '<f4', 'fortran_order': False, 'shape': (2, 3), }
//! ```
//!
//! The dictionary is padded with spaces and terminated by a newline, such that the total
//! header length is a multiple of 16 bytes. Only version 1.0 headers are written, while the
//! 32-bit length field of versions 2.0 and 3.0 is understood when reading.

use std::io::{self, Read};

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while},
    character::complete::{char, digit1, multispace0, space0},
    combinator::{all_consuming, map, map_res, opt, value},
    multi::separated_list1,
    sequence::{delimited, pair, preceded, terminated},
    IResult,
};

use crate::{
    element::{ElementType, TypeDescriptor},
    error::{Error, Result},
    array::Shape,
};

/// The npy magic number.
pub const MAGIC: [u8; 6] = *b"\x93NUMPY";

/// Alignment of the full header in bytes.
const ALIGNMENT: usize = 16;

/// Returns `true` if the bytes start with the npy magic number.
pub fn is_npy(bytes: &[u8]) -> bool {
    bytes.starts_with(&MAGIC)
}

/// The npy format version.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Version {
    /// Major version.
    pub major: u8,
    /// Minor version.
    pub minor: u8,
}

impl Version {
    /// Version 1.0, the version used when writing.
    pub const V1: Self = Self { major: 1, minor: 0 };

    /// Returns the width of the header length field in bytes.
    fn length_field_width(&self) -> Result<usize> {
        match self.major {
            1 => Ok(2),
            2 | 3 => Ok(4),
            major => Err(Error::MalformedHeader(format!(
                "unsupported format version {major}.{}",
                self.minor
            ))),
        }
    }

    /// Returns the length of the preamble preceding the header dictionary.
    fn preamble_len(&self) -> Result<usize> {
        Ok(MAGIC.len() + 2 + self.length_field_width()?)
    }
}

/// An npy header.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Header {
    version: Version,
    descr: TypeDescriptor,
    fortran_order: bool,
    shape: Shape,
    element_count: usize,
}

impl Header {
    /// Creates a new version 1.0 header for a C-order array.
    pub fn new<S>(descr: TypeDescriptor, shape: S) -> Self
    where
        Shape: From<S>,
    {
        let shape = Shape::from(shape);

        Self {
            version: Version::V1,
            descr,
            fortran_order: false,
            element_count: shape.elements(),
            shape,
        }
    }

    /// Returns the number of bytes of element data following the header.
    pub fn data_len(&self) -> Result<usize> {
        self.element_count
            .checked_mul(self.descr.element_type.width())
            .ok_or_else(|| Error::MalformedHeader(String::from("data length overflows")))
    }

    /// Returns the type descriptor.
    pub fn descr(&self) -> TypeDescriptor {
        self.descr
    }

    /// Returns the number of elements in the array.
    pub fn element_count(&self) -> usize {
        self.element_count
    }

    /// Returns the element type.
    pub fn element_type(&self) -> ElementType {
        self.descr.element_type
    }

    /// Returns `true` if elements are stored in Fortran (column-major) order.
    ///
    /// Element data is never reordered, so callers must honour this flag when interpreting
    /// multi-dimensional indices.
    pub fn is_fortran_order(&self) -> bool {
        self.fortran_order
    }

    /// Returns the shape.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Returns the format version.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Builds the header bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.to_bytes_with_padding(None)
    }

    /// Builds the header bytes, padded to exactly `reserved` bytes.
    ///
    /// This is used when rewriting a header in place.
    pub(crate) fn to_bytes_padded_to(&self, reserved: usize) -> Result<Vec<u8>> {
        self.to_bytes_with_padding(Some(reserved))
    }

    fn to_bytes_with_padding(&self, reserved: Option<usize>) -> Result<Vec<u8>> {
        self.descr.validate()?;

        let mut dict = self.dict().into_bytes();
        let preamble_len = Version::V1.preamble_len()?;

        let padding = ALIGNMENT - (preamble_len + dict.len()) % ALIGNMENT;
        let padded_len = match reserved {
            Some(reserved) if reserved > preamble_len + dict.len() => reserved - preamble_len,
            Some(reserved) => {
                return Err(Error::HeaderGrowthUnsupported {
                    reserved,
                    required: preamble_len + dict.len() + padding,
                })
            }
            None => dict.len() + padding,
        };

        dict.resize(padded_len, b' ');
        if let Some(last) = dict.last_mut() {
            *last = b'\n';
        }

        let len = u16::try_from(dict.len())
            .map_err(|_| Error::HeaderTooLarge { len: dict.len() })?;

        let mut bytes = Vec::with_capacity(preamble_len + dict.len());
        bytes.extend_from_slice(&MAGIC);
        bytes.extend([Version::V1.major, Version::V1.minor]);
        bytes.extend(len.to_le_bytes());
        bytes.extend(dict);

        Ok(bytes)
    }

    fn dict(&self) -> String {
        let fortran_order = if self.fortran_order { "True" } else { "False" };

        format!(
            "{{'descr': '{}', 'fortran_order': {fortran_order}, 'shape': {}, }}",
            self.descr, self.shape,
        )
    }

    /// Parses a header from the start of the provided bytes.
    ///
    /// Any bytes following the header are ignored.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        Self::read(&mut &bytes[..])
    }

    /// Reads a header from a reader.
    ///
    /// The stream is assumed to be positioned at the start, and will be positioned at the start
    /// of the element data on success.
    pub fn read<R>(reader: &mut R) -> Result<Self>
    where
        R: Read,
    {
        Self::read_with_len(reader).map(|(header, _)| header)
    }

    /// Reads a header from a reader, returning also the total length of the header in bytes.
    pub(crate) fn read_with_len<R>(reader: &mut R) -> Result<(Self, usize)>
    where
        R: Read,
    {
        let mut magic = [0; 6];
        read_exact_or(reader, &mut magic, || Error::BadMagic)?;
        if magic != MAGIC {
            return Err(Error::BadMagic);
        }

        let mut version = [0; 2];
        read_exact_or(reader, &mut version, truncated_header)?;
        let version = Version {
            major: version[0],
            minor: version[1],
        };

        let dict_len = match version.length_field_width()? {
            2 => {
                let mut buf = [0; 2];
                read_exact_or(reader, &mut buf, truncated_header)?;
                usize::from(u16::from_le_bytes(buf))
            }
            _ => {
                let mut buf = [0; 4];
                read_exact_or(reader, &mut buf, truncated_header)?;
                usize::try_from(u32::from_le_bytes(buf))
                    .map_err(|_| Error::MalformedHeader(String::from("header too long")))?
            }
        };

        let mut dict = vec![0; dict_len];
        read_exact_or(reader, &mut dict, truncated_header)?;

        let dict = std::str::from_utf8(&dict)
            .map_err(|_| Error::MalformedHeader(String::from("header dictionary is not text")))?;

        let (descr, fortran_order, shape) = parse_dict(dict)?;
        let element_count = shape
            .checked_elements()
            .ok_or_else(|| Error::MalformedHeader(format!("shape {shape} overflows")))?;

        log::trace!("Parsed npy header '{}'", dict.trim_end());

        let header = Self {
            version,
            descr,
            fortran_order,
            shape,
            element_count,
        };

        Ok((header, version.preamble_len()? + dict_len))
    }
}

/// Builds the header bytes for a C-order array of native byte order.
pub fn build<S>(element_type: ElementType, shape: S) -> Result<Vec<u8>>
where
    Shape: From<S>,
{
    Header::new(TypeDescriptor::native(element_type), shape).to_bytes()
}

/// Parses a header from the start of the provided bytes.
pub fn parse(bytes: &[u8]) -> Result<Header> {
    Header::parse(bytes)
}

fn truncated_header() -> Error {
    Error::MalformedHeader(String::from("header ends unexpectedly"))
}

fn read_exact_or<R, F>(reader: &mut R, buf: &mut [u8], f: F) -> Result<()>
where
    R: Read,
    F: FnOnce() -> Error,
{
    match reader.read_exact(buf) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(f()),
        Err(e) => Err(Error::Io(e)),
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
enum Entry<'a> {
    Descr(&'a str),
    FortranOrder(bool),
    Shape(Vec<usize>),
}

impl<'a> Entry<'a> {
    fn key(&self) -> &'static str {
        match self {
            Entry::Descr(_) => "descr",
            Entry::FortranOrder(_) => "fortran_order",
            Entry::Shape(_) => "shape",
        }
    }
}

fn parse_dict(s: &str) -> Result<(TypeDescriptor, bool, Shape)> {
    let malformed =
        || Error::MalformedHeader(format!("invalid header dictionary '{}'", s.trim_end()));

    let (_, entries) = all_consuming(terminated(dict, multispace0))(s).map_err(|_| malformed())?;

    let (mut descr, mut fortran_order, mut shape) = (None, None, None);
    for entry in entries {
        let key = entry.key();
        let duplicate = match entry {
            Entry::Descr(v) => descr.replace(v).is_some(),
            Entry::FortranOrder(v) => fortran_order.replace(v).is_some(),
            Entry::Shape(v) => shape.replace(v).is_some(),
        };

        if duplicate {
            return Err(Error::MalformedHeader(format!("duplicate key '{key}'")));
        }
    }

    let missing = |key| Error::MalformedHeader(format!("missing key '{key}'"));
    let descr = descr
        .ok_or_else(|| missing("descr"))?
        .parse::<TypeDescriptor>()?;
    let fortran_order = fortran_order.ok_or_else(|| missing("fortran_order"))?;
    let shape = shape.ok_or_else(|| missing("shape"))?;

    Ok((descr, fortran_order, Shape(shape)))
}

fn separator(s: &str) -> IResult<&str, char> {
    delimited(space0, char(','), space0)(s)
}

fn quoted(s: &str) -> IResult<&str, &str> {
    alt((
        delimited(char('\''), take_while(|c| c != '\''), char('\'')),
        delimited(char('"'), take_while(|c| c != '"'), char('"')),
    ))(s)
}

fn key<'a>(name: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    terminated(
        alt((
            delimited(char('\''), tag(name), char('\'')),
            delimited(char('"'), tag(name), char('"')),
        )),
        delimited(space0, char(':'), space0),
    )
}

fn boolean(s: &str) -> IResult<&str, bool> {
    alt((value(true, tag("True")), value(false, tag("False"))))(s)
}

fn dimension(s: &str) -> IResult<&str, usize> {
    map_res(digit1, |s: &str| s.parse::<usize>())(s)
}

fn shape(s: &str) -> IResult<&str, Vec<usize>> {
    delimited(
        pair(char('('), space0),
        map(
            opt(terminated(separated_list1(separator, dimension), opt(separator))),
            Option::unwrap_or_default,
        ),
        pair(space0, char(')')),
    )(s)
}

fn entry(s: &str) -> IResult<&str, Entry<'_>> {
    alt((
        map(preceded(key("descr"), quoted), Entry::Descr),
        map(preceded(key("fortran_order"), boolean), Entry::FortranOrder),
        map(preceded(key("shape"), shape), Entry::Shape),
    ))(s)
}

fn dict(s: &str) -> IResult<&str, Vec<Entry<'_>>> {
    delimited(
        pair(char('{'), space0),
        terminated(separated_list1(separator, entry), opt(separator)),
        pair(space0, char('}')),
    )(s)
}
