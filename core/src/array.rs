//! N-dimensional arrays backed by raw element bytes.

use std::{io, path::Path};

mod buffer;
pub use buffer::ArrayBuffer;

pub mod npy;
use npy::header::Header;

pub mod shape;
pub use shape::Shape;

use crate::{
    element::{Element, ElementType, TypeDescriptor},
    error::{Error, Result},
};

/// An array loaded from, or to be saved to, the npy format.
///
/// The array owns its element bytes. Elements are kept in storage order, which is
/// row-major unless [`Array::is_fortran_order`] is set.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Array {
    header: Header,
    buffer: ArrayBuffer,
}

impl Array {
    /// Returns the element buffer.
    pub fn buffer(&self) -> &ArrayBuffer {
        &self.buffer
    }

    /// Returns the type descriptor.
    pub fn descr(&self) -> TypeDescriptor {
        self.header.descr()
    }

    /// Returns the number of elements.
    pub fn element_count(&self) -> usize {
        self.header.element_count()
    }

    /// Returns the element type.
    pub fn element_type(&self) -> ElementType {
        self.header.element_type()
    }

    /// Creates a new array from a slice of elements in row-major order.
    pub fn from_slice<T, S>(values: &[T], shape: S) -> Result<Self>
    where
        T: Element,
        Shape: From<S>,
    {
        Self::new(ArrayBuffer::from_slice(values), shape)
    }

    pub(crate) fn from_parts(header: Header, buffer: ArrayBuffer) -> Self {
        Self { header, buffer }
    }

    /// Returns the header.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Returns the buffer, consuming the array.
    pub fn into_buffer(self) -> ArrayBuffer {
        self.buffer
    }

    /// Returns `true` if elements are stored in Fortran (column-major) order.
    pub fn is_fortran_order(&self) -> bool {
        self.header.is_fortran_order()
    }

    /// Loads an array from an npy file.
    pub fn load<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        npy::load(path)
    }

    /// Creates a new row-major array from a buffer.
    ///
    /// Fails if the number of elements in the buffer does not match the shape.
    pub fn new<S>(buffer: ArrayBuffer, shape: S) -> Result<Self>
    where
        Shape: From<S>,
    {
        let shape = Shape::from(shape);
        check_fits(&buffer, &shape)?;

        Ok(Self::from_parts(
            Header::new::<Shape>(buffer.descr(), shape),
            buffer,
        ))
    }

    /// Reads an array in npy format from a reader.
    ///
    /// The stream is assumed to be positioned at the start.
    pub fn read_npy<R>(mut reader: R) -> Result<Self>
    where
        R: io::Read,
    {
        npy::read_array(&mut reader)
    }

    /// Saves the array to an npy file.
    pub fn save<P>(&self, path: P, mode: npy::Mode) -> Result<()>
    where
        P: AsRef<Path>,
    {
        npy::save(path, &self.buffer, self.shape().clone(), mode)
    }

    /// Returns the shape.
    pub fn shape(&self) -> &Shape {
        self.header.shape()
    }

    /// Returns the elements decoded as `T`, in storage order.
    pub fn to_vec<T>(&self) -> Result<Vec<T>>
    where
        T: Element,
    {
        self.buffer.to_vec()
    }

    /// Writes the array in npy format to a writer.
    pub fn write_npy<W>(&self, mut writer: W) -> Result<()>
    where
        W: io::Write,
    {
        npy::write_array(&mut writer, &self.buffer, self.shape().clone())
    }
}

/// Checks that the buffer holds exactly the elements of the shape.
pub(crate) fn check_fits(buffer: &ArrayBuffer, shape: &Shape) -> Result<()> {
    buffer.descr().validate()?;

    let whole = buffer.as_bytes().len() % buffer.element_type().width() == 0;
    if whole && shape.checked_elements() == Some(buffer.len()) {
        Ok(())
    } else {
        Err(Error::ShapeMismatch {
            shape: shape.clone(),
            elements: buffer.len(),
        })
    }
}
