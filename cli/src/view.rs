use std::{
    fmt,
    io::{self, Write},
    path::PathBuf,
};

use anyhow::Error;

use clap::Parser;
use npy_core::{element::f16, Array, ArrayBuffer, Element, ElementType};

/// Print the elements of an npy file.
///
/// Elements are printed in storage order, with one line per entry along the leading axis.
#[derive(Debug, Parser)]
pub struct View {
    /// Input npy file.
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Precision to use when printing floats.
    #[arg(short = 'p', long, default_value_t = 6, value_name = "INT")]
    pub precision: usize,
}

impl View {
    pub fn run(self) -> Result<(), Error> {
        let array = npy_core::load(&self.path)?;

        write_array(&mut io::stdout().lock(), &array, self.precision)?;

        Ok(())
    }
}

fn write_array<W>(writer: &mut W, array: &Array, precision: usize) -> Result<(), Error>
where
    W: Write,
{
    let values = format_values(array.buffer(), precision)?;

    let row_len = match &array.shape()[..] {
        [rows, _, ..] if *rows > 0 => array.element_count() / rows,
        _ => values.len(),
    };

    for row in values.chunks(row_len.max(1)) {
        writeln!(writer, "{}", row.join(" "))?;
    }

    Ok(())
}

fn format_values(buffer: &ArrayBuffer, precision: usize) -> Result<Vec<String>, Error> {
    Ok(match buffer.element_type() {
        ElementType::I1 => format_plain::<i8>(buffer)?,
        ElementType::I2 => format_plain::<i16>(buffer)?,
        ElementType::I4 => format_plain::<i32>(buffer)?,
        ElementType::I8 => format_plain::<i64>(buffer)?,
        ElementType::U1 => format_plain::<u8>(buffer)?,
        ElementType::U2 => format_plain::<u16>(buffer)?,
        ElementType::U4 => format_plain::<u32>(buffer)?,
        ElementType::U8 => format_plain::<u64>(buffer)?,
        ElementType::F2 => format_float::<f16>(buffer, precision)?,
        ElementType::F4 => format_float::<f32>(buffer, precision)?,
        ElementType::F8 => format_float::<f64>(buffer, precision)?,
        ElementType::Bytes(_) => buffer
            .strings()?
            .map(|s| String::from_utf8_lossy(s).into_owned())
            .collect(),
    })
}

fn format_plain<T>(buffer: &ArrayBuffer) -> Result<Vec<String>, Error>
where
    T: Element + fmt::Display,
{
    Ok(buffer.iter::<T>()?.map(|v| v.to_string()).collect())
}

fn format_float<T>(buffer: &ArrayBuffer, precision: usize) -> Result<Vec<String>, Error>
where
    T: Element + fmt::Display,
{
    Ok(buffer
        .iter::<T>()?
        .map(|v| format!("{v:.precision$}"))
        .collect())
}
