//! Reading and writing in the numpy npy format.
//!
//! The npy format is described [here][spec]. A single array is stored as a header followed by
//! its raw element bytes. Arrays are always written in C order, while Fortran-order arrays can
//! be read but are not reordered.
//!
//! Besides writing whole files, arrays can be appended to an existing file along the leading
//! axis using [`Mode::Append`]. Appending reads and rewrites the header of the existing file,
//! and is therefore not atomic: concurrent appends to the same path must be serialised by the
//! caller.
//!
//! [spec]: https://numpy.org/neps/nep-0001-npy-format.html

use std::{
    fs,
    io::{self, Read, Seek, SeekFrom, Write},
    path::Path,
};

pub mod header;
use header::Header;

use super::{check_fits, Array, ArrayBuffer, Shape};

use crate::{
    element::Element,
    error::{AppendMismatch, Error, Result},
};

pub use header::MAGIC;

/// How to save an array to a path.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum Mode {
    /// Create a new file, or truncate an existing file.
    #[default]
    Write,
    /// Append to the leading axis of an existing file, or create a new file if none exists.
    Append,
}

/// Reads an array in npy format from a reader.
///
/// The stream is assumed to be positioned at the start.
pub fn read_array<R>(reader: &mut R) -> Result<Array>
where
    R: Read,
{
    let header = Header::read(reader)?;
    let expected = header.data_len()?;

    let mut bytes = Vec::new();
    reader.take(expected as u64).read_to_end(&mut bytes)?;

    if bytes.len() < expected {
        return Err(Error::TruncatedData {
            expected,
            found: bytes.len(),
        });
    }

    log::trace!(
        "Read npy array with type {} and shape {}",
        header.descr(),
        header.shape()
    );

    let buffer = ArrayBuffer::from_bytes(header.descr(), bytes);
    Ok(Array::from_parts(header, buffer))
}

/// Writes an array in npy format to a writer.
pub fn write_array<W, S>(writer: &mut W, buffer: &ArrayBuffer, shape: S) -> Result<()>
where
    W: Write,
    Shape: From<S>,
{
    let shape = Shape::from(shape);
    check_fits(buffer, &shape)?;

    let header = Header::new::<Shape>(buffer.descr(), shape).to_bytes()?;

    writer.write_all(&header)?;
    writer.write_all(buffer.as_bytes())?;

    Ok(())
}

/// Loads an array from an npy file.
pub fn load<P>(path: P) -> Result<Array>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    log::debug!("Loading npy array from '{}'", path.display());

    let mut reader = io::BufReader::new(fs::File::open(path)?);
    read_array(&mut reader)
}

/// Reads only the header of an npy file.
pub fn read_header<P>(path: P) -> Result<Header>
where
    P: AsRef<Path>,
{
    Header::read(&mut io::BufReader::new(fs::File::open(path)?))
}

/// Saves an array to an npy file.
///
/// In [`Mode::Append`], the buffer is appended along the leading axis of the array in the
/// existing file. The element widths, the number of dimensions, and all non-leading dimensions
/// must match, and the existing file is left untouched if they do not. If no file exists at the
/// path, a new file is written as in [`Mode::Write`].
pub fn save<P, S>(path: P, buffer: &ArrayBuffer, shape: S, mode: Mode) -> Result<()>
where
    P: AsRef<Path>,
    Shape: From<S>,
{
    let path = path.as_ref();
    let shape = Shape::from(shape);
    check_fits(buffer, &shape)?;

    match mode {
        Mode::Write => write_to_path(path, buffer, shape),
        Mode::Append => match fs::OpenOptions::new().read(true).write(true).open(path) {
            Ok(file) => append(file, path, buffer, shape),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!(
                    "No npy file at '{}' to append to, writing new file",
                    path.display()
                );
                write_to_path(path, buffer, shape)
            }
            Err(e) => Err(e.into()),
        },
    }
}

/// Saves a slice of elements to an npy file.
///
/// See [`save`] for details.
pub fn save_slice<P, T, S>(path: P, values: &[T], shape: S, mode: Mode) -> Result<()>
where
    P: AsRef<Path>,
    T: Element,
    Shape: From<S>,
{
    save(path, &ArrayBuffer::from_slice(values), shape, mode)
}

/// Saves a slice of elements to an npy file as a one-dimensional array.
///
/// See [`save`] for details.
pub fn save_flat<P, T>(path: P, values: &[T], mode: Mode) -> Result<()>
where
    P: AsRef<Path>,
    T: Element,
{
    save_slice(path, values, Shape::flat(values.len()), mode)
}

fn write_to_path(path: &Path, buffer: &ArrayBuffer, shape: Shape) -> Result<()> {
    log::debug!(
        "Writing npy array with type {} and shape {shape} to '{}'",
        buffer.descr(),
        path.display()
    );

    let mut writer = io::BufWriter::new(fs::File::create(path)?);
    write_array(&mut writer, buffer, shape)?;
    writer.flush()?;

    Ok(())
}

fn append(mut file: fs::File, path: &Path, buffer: &ArrayBuffer, shape: Shape) -> Result<()> {
    let (existing, header_len) = Header::read_with_len(&mut file)?;

    let merged = check_append(&existing, buffer, &shape)?;
    let header = Header::new(existing.descr(), merged).to_bytes_padded_to(header_len)?;

    let data_start = header_len as u64;
    let data_end = data_start + existing.data_len()? as u64;
    let file_len = file.metadata()?.len();
    if file_len < data_end {
        return Err(Error::TruncatedData {
            expected: existing.data_len()?,
            found: (file_len - data_start.min(file_len)) as usize,
        });
    }

    log::debug!(
        "Appending npy array with shape {shape} to '{}' with shape {}",
        path.display(),
        existing.shape(),
    );

    file.seek(SeekFrom::Start(data_end))?;
    file.write_all(buffer.as_bytes())?;
    file.set_len(data_end + buffer.as_bytes().len() as u64)?;

    file.seek(SeekFrom::Start(0))?;
    file.write_all(&header)?;
    file.flush()?;

    Ok(())
}

/// Checks that the buffer can be appended to the existing array, returning the merged shape.
fn check_append(existing: &Header, buffer: &ArrayBuffer, shape: &Shape) -> Result<Shape> {
    if existing.is_fortran_order() {
        return Err(AppendMismatch::FortranOrder.into());
    }

    let (existing_type, new_type) = (existing.element_type(), buffer.element_type());
    if existing_type.width() != new_type.width() {
        return Err(AppendMismatch::Width {
            existing: existing_type.width(),
            new: new_type.width(),
        }
        .into());
    }

    let (existing_endian, new_endian) = (existing.descr().endian, buffer.endian());
    if existing_type.has_byte_order() && new_type.has_byte_order() && existing_endian != new_endian
    {
        return Err(AppendMismatch::ByteOrder {
            existing: existing_endian,
            new: new_endian,
        }
        .into());
    }

    Ok(existing.shape().stack(shape)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::PathBuf;

    use crate::element::{ElementType, Endian, TypeDescriptor};

    fn temp_path(dir: &tempfile::TempDir, name: &str) -> PathBuf {
        dir.path().join(name)
    }

    fn values(n: usize, offset: i32) -> Vec<i32> {
        (0..n as i32).map(|x| x + offset).collect()
    }

    #[test]
    fn test_round_trip_types_and_ranks() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = temp_path(&dir, "array.npy");

        let shapes = [vec![], vec![0], vec![7], vec![2, 3], vec![2, 1, 3], vec![1, 2, 2, 2]];

        for shape in shapes {
            let n = Shape(shape.clone()).elements();

            let buffers = [
                ArrayBuffer::from_slice(&(0..n).map(|x| x as i8).collect::<Vec<_>>()),
                ArrayBuffer::from_slice(&(0..n).map(|x| x as u16).collect::<Vec<_>>()),
                ArrayBuffer::from_slice(&(0..n).map(|x| x as i64 - 3).collect::<Vec<_>>()),
                ArrayBuffer::from_slice(&(0..n).map(|x| x as f32 / 3.).collect::<Vec<_>>()),
                ArrayBuffer::from_slice(&(0..n).map(|x| x as f64 * 1e10).collect::<Vec<_>>()),
                ArrayBuffer::from_bytes(
                    TypeDescriptor::native(ElementType::Bytes(5)),
                    (0..n * 5).map(|x| x as u8).collect::<Vec<_>>(),
                ),
            ];

            for buffer in buffers {
                save(&path, &buffer, shape.clone(), Mode::Write)?;
                let array = load(&path)?;

                assert_eq!(array.shape(), &Shape(shape.clone()));
                assert_eq!(array.buffer(), &buffer);
                assert!(!array.is_fortran_order());
            }
        }

        Ok(())
    }

    #[test]
    fn test_write_truncates_existing() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = temp_path(&dir, "array.npy");

        save_flat(&path, &values(100, 0), Mode::Write)?;
        save_flat(&path, &values(2, 0), Mode::Write)?;

        assert_eq!(load(&path)?.to_vec::<i32>()?, vec![0, 1]);

        Ok(())
    }

    #[test]
    fn test_save_rejects_shape_mismatch() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = temp_path(&dir, "array.npy");

        let result = save_slice(&path, &values(5, 0), [2, 3], Mode::Write);

        assert!(matches!(result, Err(Error::ShapeMismatch { elements: 5, .. })));
        assert!(!path.exists());

        Ok(())
    }

    #[test]
    fn test_append() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = temp_path(&dir, "array.npy");

        let first = values(12, 0);
        let second = values(8, 100);

        save_slice(&path, &first, [3, 4], Mode::Write)?;
        save_slice(&path, &second, [2, 4], Mode::Append)?;

        let array = load(&path)?;
        assert_eq!(array.shape(), &Shape::from([5, 4]));

        let loaded = array.to_vec::<i32>()?;
        assert_eq!(&loaded[..12], &first[..]);
        assert_eq!(&loaded[12..], &second[..]);

        Ok(())
    }

    #[test]
    fn test_append_creates_missing_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = temp_path(&dir, "array.npy");

        save_slice(&path, &values(6, 0), [3, 2], Mode::Append)?;

        let array = load(&path)?;
        assert_eq!(array.shape(), &Shape::from([3, 2]));
        assert_eq!(array.to_vec::<i32>()?, values(6, 0));

        Ok(())
    }

    #[test]
    fn test_append_repeatedly_across_digit_growth() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = temp_path(&dir, "array.npy");

        for i in 0..12 {
            save_flat(&path, &values(1, i), Mode::Append)?;
        }

        let array = load(&path)?;
        assert_eq!(array.shape(), &Shape::from(12));
        assert_eq!(array.to_vec::<i32>()?, values(12, 0));

        Ok(())
    }

    #[test]
    fn test_append_rejects_mismatched_dimension() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = temp_path(&dir, "array.npy");

        save_slice(&path, &values(12, 0), [3, 4], Mode::Write)?;
        let before = fs::read(&path)?;

        let result = save_slice(&path, &values(10, 0), [2, 5], Mode::Append);

        assert!(matches!(
            result,
            Err(Error::IncompatibleAppend(AppendMismatch::Dimension {
                axis: 1,
                existing: 4,
                new: 5,
            }))
        ));
        assert_eq!(fs::read(&path)?, before);

        Ok(())
    }

    #[test]
    fn test_append_rejects_mismatched_width_and_rank() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = temp_path(&dir, "array.npy");

        save_slice(&path, &values(12, 0), [3, 4], Mode::Write)?;
        let before = fs::read(&path)?;

        assert!(matches!(
            save_slice(&path, &[0f64; 4], [1, 4], Mode::Append),
            Err(Error::IncompatibleAppend(AppendMismatch::Width {
                existing: 4,
                new: 8
            }))
        ));
        assert!(matches!(
            save_flat(&path, &values(4, 0), Mode::Append),
            Err(Error::IncompatibleAppend(AppendMismatch::Rank {
                existing: 2,
                new: 1
            }))
        ));
        assert_eq!(fs::read(&path)?, before);

        Ok(())
    }

    #[test]
    fn test_append_same_width_different_kind() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = temp_path(&dir, "array.npy");

        save_flat(&path, &[1u32, 2], Mode::Write)?;
        save_flat(&path, &[3i32], Mode::Append)?;

        let array = load(&path)?;
        assert_eq!(array.element_type(), ElementType::U4);
        assert_eq!(array.to_vec::<u32>()?, vec![1, 2, 3]);

        Ok(())
    }

    #[test]
    fn test_append_rejects_byte_order_mismatch() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = temp_path(&dir, "array.npy");

        let foreign = match Endian::native() {
            Endian::Little => Endian::Big,
            _ => Endian::Little,
        };
        let buffer = ArrayBuffer::from_bytes(TypeDescriptor::new(foreign, ElementType::U2), vec![0, 1]);
        save(&path, &buffer, 1, Mode::Write)?;

        assert!(matches!(
            save_flat(&path, &[1u16], Mode::Append),
            Err(Error::IncompatibleAppend(AppendMismatch::ByteOrder { .. }))
        ));

        Ok(())
    }

    #[test]
    fn test_append_rejects_scalar() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = temp_path(&dir, "array.npy");

        save_slice(&path, &[1.0f32], Shape::scalar(), Mode::Write)?;

        assert!(matches!(
            save_slice(&path, &[2.0f32], Shape::scalar(), Mode::Append),
            Err(Error::IncompatibleAppend(AppendMismatch::Scalar))
        ));

        Ok(())
    }

    #[test]
    fn test_append_rejects_leading_overflow() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = temp_path(&dir, "array.npy");

        save_slice::<_, u8, _>(&path, &[], [usize::MAX, 0], Mode::Write)?;
        assert_eq!(load(&path)?.shape()[..], [usize::MAX, 0]);
        let before = fs::read(&path)?;

        assert!(matches!(
            save_slice::<_, u8, _>(&path, &[], [1, 0], Mode::Append),
            Err(Error::IncompatibleAppend(AppendMismatch::LeadingOverflow {
                existing: usize::MAX,
                new: 1
            }))
        ));
        assert_eq!(fs::read(&path)?, before);

        Ok(())
    }

    #[test]
    fn test_save_resolves_missing_byte_order() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = temp_path(&dir, "array.npy");

        let descr = TypeDescriptor::new(Endian::NotApplicable, ElementType::I4);
        let buffer = ArrayBuffer::from_bytes(descr, 7i32.to_ne_bytes().to_vec());
        save(&path, &buffer, 1, Mode::Write)?;

        let array = load(&path)?;
        assert_eq!(array.descr(), TypeDescriptor::native(ElementType::I4));
        assert_eq!(array.to_vec::<i32>()?, vec![7]);

        Ok(())
    }

    #[test]
    fn test_save_rejects_literal_descriptor_without_byte_order() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = temp_path(&dir, "array.npy");

        let descr = TypeDescriptor {
            endian: Endian::NotApplicable,
            element_type: ElementType::I4,
        };
        let buffer = ArrayBuffer::from_bytes(descr, vec![1, 0, 0, 0]);

        assert!(matches!(
            save(&path, &buffer, 1, Mode::Write),
            Err(Error::UnsupportedElementType(s)) if s == "|i4"
        ));
        assert!(!path.exists());

        Ok(())
    }

    fn write_raw(path: &Path, dict: &str, data: &[u8]) -> Result<()> {
        let mut bytes = MAGIC.to_vec();
        bytes.extend([1, 0]);
        bytes.extend((dict.len() as u16).to_le_bytes());
        bytes.extend(dict.as_bytes());
        bytes.extend(data);
        fs::write(path, bytes)?;
        Ok(())
    }

    #[test]
    fn test_append_rejects_fortran_order() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = temp_path(&dir, "array.npy");

        write_raw(
            &path,
            "{'descr': '|u1', 'fortran_order': True, 'shape': (2, 2), }\n",
            &[1, 2, 3, 4],
        )?;

        assert!(matches!(
            save_slice(&path, &[5u8, 6], [1, 2], Mode::Append),
            Err(Error::IncompatibleAppend(AppendMismatch::FortranOrder))
        ));

        Ok(())
    }

    #[test]
    fn test_append_header_growth_unsupported() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = temp_path(&dir, "array.npy");

        // 10 + 54 bytes leaves no room for an extra digit
        let dict = "{'descr': '|u1', 'fortran_order':False, 'shape':(9,)}\n";
        assert_eq!(10 + dict.len(), 64);
        write_raw(&path, dict, &[0; 9])?;
        let before = fs::read(&path)?;

        assert!(matches!(
            save_flat(&path, &[1u8], Mode::Append),
            Err(Error::HeaderGrowthUnsupported { reserved: 64, .. })
        ));
        assert_eq!(fs::read(&path)?, before);

        Ok(())
    }

    #[test]
    fn test_append_keeps_wider_foreign_padding() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = temp_path(&dir, "array.npy");

        let mut dict = String::from("{'descr': '|u1', 'fortran_order': False, 'shape': (2,), }");
        while (10 + dict.len() + 1) % 128 != 0 {
            dict.push(' ');
        }
        dict.push('\n');
        write_raw(&path, &dict, &[1, 2])?;

        save_flat(&path, &[3u8], Mode::Append)?;

        let (header, header_len) = Header::read_with_len(&mut fs::File::open(&path)?)?;
        assert_eq!(header_len, 128);
        assert_eq!(header.shape(), &Shape::from(3));
        assert_eq!(load(&path)?.to_vec::<u8>()?, vec![1, 2, 3]);

        Ok(())
    }

    #[test]
    fn test_append_rejects_truncated_existing() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = temp_path(&dir, "array.npy");

        save_flat(&path, &values(4, 0), Mode::Write)?;
        let mut bytes = fs::read(&path)?;
        bytes.truncate(bytes.len() - 3);
        fs::write(&path, &bytes)?;

        assert!(matches!(
            save_flat(&path, &values(1, 0), Mode::Append),
            Err(Error::TruncatedData {
                expected: 16,
                found: 13
            })
        ));

        Ok(())
    }

    #[test]
    fn test_append_to_invalid_file_fails() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = temp_path(&dir, "array.npy");

        fs::write(&path, b"#SHAPE=<3>\n1 2 3\n")?;

        assert!(matches!(
            save_flat(&path, &values(1, 0), Mode::Append),
            Err(Error::BadMagic)
        ));
        assert_eq!(fs::read(&path)?, b"#SHAPE=<3>\n1 2 3\n");

        Ok(())
    }

    #[test]
    fn test_load_bad_magic() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = temp_path(&dir, "array.npy");

        save_flat(&path, &values(3, 0), Mode::Write)?;
        let mut bytes = fs::read(&path)?;
        bytes[1] = b'n';
        fs::write(&path, &bytes)?;

        assert!(matches!(load(&path), Err(Error::BadMagic)));

        Ok(())
    }

    #[test]
    fn test_load_truncated_data() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = temp_path(&dir, "array.npy");

        save_slice(&path, &values(6, 0), [2, 3], Mode::Write)?;
        let mut bytes = fs::read(&path)?;
        bytes.truncate(bytes.len() - 1);
        fs::write(&path, &bytes)?;

        assert!(matches!(
            load(&path),
            Err(Error::TruncatedData {
                expected: 24,
                found: 23
            })
        ));

        Ok(())
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();

        assert!(matches!(
            load(temp_path(&dir, "missing.npy")),
            Err(Error::Io(e)) if e.kind() == io::ErrorKind::NotFound
        ));
    }

    #[test]
    fn test_load_fortran_order_passes_through() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = temp_path(&dir, "array.npy");

        write_raw(
            &path,
            "{'descr': '<i2', 'fortran_order': True, 'shape': (2, 3), }\n",
            &[1, 0, 2, 0, 3, 0, 4, 0, 5, 0, 6, 0],
        )?;

        let array = load(&path)?;
        assert!(array.is_fortran_order());
        assert_eq!(array.shape(), &Shape::from([2, 3]));
        assert_eq!(array.to_vec::<i16>()?, vec![1, 2, 3, 4, 5, 6]);

        Ok(())
    }

    #[test]
    fn test_read_header() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = temp_path(&dir, "array.npy");

        save_slice(&path, &[0f32; 24], [2, 3, 4], Mode::Write)?;

        let header = read_header(&path)?;
        assert_eq!(header.shape(), &Shape::from([2, 3, 4]));
        assert_eq!(header.element_type(), ElementType::F4);
        assert_eq!(header.element_count(), 24);

        Ok(())
    }
}
