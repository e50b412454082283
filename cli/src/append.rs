use std::path::PathBuf;

use anyhow::{bail, Error};

use clap::Parser;
use npy_core::Mode;

/// Append npy files to another npy file.
///
/// Each source array is appended along the leading axis of the target array, in the order
/// given. Sources must match the element width, number of dimensions, and non-leading
/// dimensions of the target. If the target does not exist, it is created from the first source.
#[derive(Debug, Parser)]
pub struct Append {
    /// Target npy file.
    #[arg(value_name = "TARGET")]
    pub target: PathBuf,

    /// Source npy files.
    #[arg(required = true, value_name = "SOURCE")]
    pub sources: Vec<PathBuf>,
}

impl Append {
    pub fn run(self) -> Result<(), Error> {
        for source in self.sources.iter() {
            let array = npy_core::load(source)?;

            if array.is_fortran_order() && array.shape().len() > 1 {
                bail!(
                    "cannot append Fortran-order array from '{}' to C-order array",
                    source.display()
                );
            }

            log::info!(
                "Appending array with shape {} from '{}' to '{}'",
                array.shape(),
                source.display(),
                self.target.display()
            );

            npy_core::save(
                &self.target,
                array.buffer(),
                array.shape().clone(),
                Mode::Append,
            )?;
        }

        Ok(())
    }
}
