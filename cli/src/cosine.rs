use std::path::PathBuf;

use anyhow::Error;

use clap::Parser;

/// Calculate the cosine similarity of two npy files.
///
/// Both files must hold single-precision floats.
#[derive(Debug, Parser)]
pub struct Cosine {
    /// First npy file.
    #[arg(value_name = "PATH")]
    pub a: PathBuf,

    /// Second npy file.
    #[arg(value_name = "PATH")]
    pub b: PathBuf,

    /// Number of elements to compare.
    ///
    /// The first elements in storage order are compared. By default, all elements of the first
    /// file are compared, and the second file must hold at least as many elements.
    #[arg(short = 'n', long, value_name = "INT")]
    pub elements: Option<usize>,

    /// Precision to use when printing the similarity.
    #[arg(short = 'p', long, default_value_t = 6, value_name = "INT")]
    pub precision: usize,
}

impl Cosine {
    pub fn run(self) -> Result<(), Error> {
        let elements = match self.elements {
            Some(elements) => elements,
            None => npy_core::array::npy::read_header(&self.a)?.element_count(),
        };

        let similarity = npy_core::compare_similarity(&self.a, &self.b, elements)?;

        let precision = self.precision;
        println!("{similarity:.precision$}");

        Ok(())
    }
}
