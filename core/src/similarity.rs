//! Cosine similarity between arrays.
//!
//! This is typically used to validate inference output against reference data.

use std::path::Path;

use crate::{
    array::npy,
    error::{Error, Result},
};

/// Returns the cosine similarity of two vectors.
///
/// Only the common prefix of the two vectors is considered. If either vector has zero norm, the
/// similarity is defined to be zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let (dot, norm_a, norm_b) = a.iter().zip(b.iter()).fold(
        (0.0, 0.0, 0.0),
        |(dot, norm_a, norm_b), (&x, &y)| {
            let (x, y) = (f64::from(x), f64::from(y));
            (dot + x * y, norm_a + x * x, norm_b + y * y)
        },
    );

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a.sqrt() * norm_b.sqrt())
    }
}

/// Returns the cosine similarity of the first `elements` elements of two npy files.
///
/// Both files must hold single-precision floats, and at least `elements` of them.
pub fn compare_similarity<P, Q>(path_a: P, path_b: Q, elements: usize) -> Result<f64>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let a = load_prefix(path_a.as_ref(), elements)?;
    let b = load_prefix(path_b.as_ref(), elements)?;

    let similarity = cosine_similarity(&a, &b);
    log::debug!("Cosine similarity of {elements} elements is {similarity}");

    Ok(similarity)
}

fn load_prefix(path: &Path, elements: usize) -> Result<Vec<f32>> {
    let array = npy::load(path)?;

    let available = array.element_count();
    if available < elements {
        return Err(Error::ElementCountMismatch {
            requested: elements,
            available,
        });
    }

    let values = array.buffer().iter::<f32>()?.take(elements).collect();
    Ok(values)
}
