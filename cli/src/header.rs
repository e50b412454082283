use std::{io, path::PathBuf};

use anyhow::Error;

use clap::Parser;

/// Print the header of an npy file.
#[derive(Debug, Parser)]
pub struct Header {
    /// Input npy file.
    #[arg(value_name = "PATH")]
    pub path: PathBuf,
}

impl Header {
    pub fn run(self) -> Result<(), Error> {
        let header = npy_core::array::npy::read_header(&self.path)?;

        write_header(&mut io::stdout().lock(), &header)?;

        Ok(())
    }
}

fn write_header<W>(writer: &mut W, header: &npy_core::Header) -> io::Result<()>
where
    W: io::Write,
{
    writeln!(writer, "descr: {}", header.descr())?;
    writeln!(writer, "fortran_order: {}", header.is_fortran_order())?;
    writeln!(writer, "shape: {}", header.shape())?;
    writeln!(writer, "elements: {}", header.element_count())
}

#[cfg(test)]
mod tests {
    use super::*;

    use npy_core::{ElementType, Endian, TypeDescriptor};

    use crate::tests::parse_subcmd;

    #[test]
    fn test_parse_path() {
        let args = parse_subcmd::<Header>("npy header output.npy");

        assert_eq!(args.path, PathBuf::from("output.npy"));
    }

    #[test]
    fn test_write_header() -> io::Result<()> {
        let header = npy_core::Header::new(
            TypeDescriptor::new(Endian::Big, ElementType::I2),
            [4, 1],
        );

        let mut dest = Vec::new();
        write_header(&mut dest, &header)?;

        assert_eq!(
            dest,
            b"descr: >i2\nfortran_order: false\nshape: (4, 1)\nelements: 4\n"
        );

        Ok(())
    }
}
