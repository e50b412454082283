use crate::{
    element::{Element, ElementType, Endian, TypeDescriptor},
    error::{Error, Result},
};

/// Owned storage for the raw bytes of array elements.
///
/// The buffer knows the type and byte order of its elements, and hands out read-only typed
/// views of them.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ArrayBuffer {
    descr: TypeDescriptor,
    bytes: Vec<u8>,
}

impl ArrayBuffer {
    /// Returns the raw element bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the type descriptor of the elements.
    pub fn descr(&self) -> TypeDescriptor {
        self.descr
    }

    /// Returns the element type.
    pub fn element_type(&self) -> ElementType {
        self.descr.element_type
    }

    /// Returns the byte order of the elements.
    pub fn endian(&self) -> Endian {
        self.descr.endian
    }

    /// Creates a buffer from raw element bytes.
    ///
    /// Trailing bytes not making up a whole element are ignored by views, and rejected when
    /// saving.
    pub fn from_bytes(descr: TypeDescriptor, bytes: Vec<u8>) -> Self {
        Self { descr, bytes }
    }

    /// Creates a buffer of native byte order from a slice of elements.
    pub fn from_slice<T>(values: &[T]) -> Self
    where
        T: Element,
    {
        let descr = TypeDescriptor::native(T::ELEMENT_TYPE);

        let mut bytes = Vec::with_capacity(values.len() * T::ELEMENT_TYPE.width());
        for v in values {
            v.extend_bytes(descr.endian, &mut bytes);
        }

        Self { descr, bytes }
    }

    /// Returns the raw element bytes, consuming the buffer.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Returns `true` if the buffer holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns an iterator over the elements, decoded as `T`.
    ///
    /// Fails if `T` does not match the element type of the buffer.
    pub fn iter<T>(&self) -> Result<impl Iterator<Item = T> + '_>
    where
        T: Element,
    {
        if T::ELEMENT_TYPE != self.element_type() {
            return Err(Error::ElementTypeMismatch {
                expected: T::ELEMENT_TYPE,
                found: self.element_type(),
            });
        }

        let endian = self.endian();
        Ok(self
            .bytes
            .chunks_exact(T::ELEMENT_TYPE.width())
            .map(move |chunk| T::from_bytes(chunk, endian)))
    }

    /// Returns the number of elements.
    pub fn len(&self) -> usize {
        match self.element_type().width() {
            0 => 0,
            width => self.bytes.len() / width,
        }
    }

    /// Returns an iterator over the elements of a byte string buffer.
    ///
    /// Trailing NUL bytes are trimmed from each string.
    pub fn strings(&self) -> Result<impl Iterator<Item = &[u8]> + '_> {
        match self.element_type() {
            ElementType::Bytes(width) if width > 0 => {
                Ok(self.bytes.chunks_exact(width).map(|chunk| {
                    let end = chunk.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
                    &chunk[..end]
                }))
            }
            found => Err(Error::ElementTypeMismatch {
                expected: ElementType::Bytes(1),
                found,
            }),
        }
    }

    /// Returns the elements decoded as `T`.
    ///
    /// Fails if `T` does not match the element type of the buffer.
    pub fn to_vec<T>(&self) -> Result<Vec<T>>
    where
        T: Element,
    {
        Ok(self.iter::<T>()?.collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use half::f16;

    #[test]
    fn test_from_slice() -> Result<()> {
        let buffer = ArrayBuffer::from_slice(&[1i32, -2, 3]);

        assert_eq!(buffer.element_type(), ElementType::I4);
        assert_eq!(buffer.endian(), Endian::native());
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.as_bytes().len(), 12);
        assert_eq!(buffer.to_vec::<i32>()?, vec![1, -2, 3]);

        Ok(())
    }

    #[test]
    fn test_single_byte_buffer_has_no_byte_order() {
        let buffer = ArrayBuffer::from_slice(&[1u8, 2]);

        assert_eq!(buffer.endian(), Endian::NotApplicable);
        assert_eq!(buffer.as_bytes(), &[1, 2]);
    }

    #[test]
    fn test_view_big_endian() -> Result<()> {
        let buffer = ArrayBuffer::from_bytes(
            TypeDescriptor::new(Endian::Big, ElementType::U2),
            vec![0, 1, 1, 0],
        );

        assert_eq!(buffer.to_vec::<u16>()?, vec![1, 256]);

        Ok(())
    }

    #[test]
    fn test_view_half() -> Result<()> {
        let values = [f16::from_f32(0.5), f16::from_f32(-2.0)];
        let buffer = ArrayBuffer::from_slice(&values);

        assert_eq!(buffer.element_type(), ElementType::F2);
        assert_eq!(buffer.to_vec::<f16>()?, values.to_vec());

        Ok(())
    }

    #[test]
    fn test_view_type_mismatch() {
        let buffer = ArrayBuffer::from_slice(&[1.0f64, 2.0]);

        assert!(matches!(
            buffer.to_vec::<f32>(),
            Err(Error::ElementTypeMismatch {
                expected: ElementType::F4,
                found: ElementType::F8,
            })
        ));
        assert!(buffer.strings().is_err());
    }

    #[test]
    fn test_strings() -> Result<()> {
        let buffer = ArrayBuffer::from_bytes(
            TypeDescriptor::native(ElementType::Bytes(3)),
            b"ab\0xyz\0\0\0".to_vec(),
        );

        let strings = buffer.strings()?.collect::<Vec<_>>();
        assert_eq!(strings, vec![&b"ab"[..], &b"xyz"[..], &b""[..]]);

        Ok(())
    }
}
