#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Reading and writing arrays in the numpy npy format.
//!
//! This serves as the core library implementation for the `npy` CLI, but can also be used as a
//! free-standing library wherever arrays need to be exchanged with numpy, for example when
//! persisting the raw output of an inference runtime or validating it against reference data.
//!
//! # Overview
//!
//! An npy file holds a single [`Array`]: a [`Header`] describing the element type and [`Shape`],
//! followed by the raw element bytes, which are owned by an [`ArrayBuffer`]. Typed, read-only
//! views of the elements are available for any type implementing [`Element`].
//!
//! Arrays are saved using [`save`] in one of two [`Mode`]s: [`Mode::Write`] creates a new file,
//! while [`Mode::Append`] grows the leading axis of an existing file.
//!
//! # Example
//!
//! ```no_run
//! use npy_core::{array::npy, Mode};
//!
//! // Save a 2x3 array, then append another row
//! npy::save_slice("output.npy", &[1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0], [2, 3], Mode::Write)?;
//! npy::save_slice("output.npy", &[7.0f32, 8.0, 9.0], [1, 3], Mode::Append)?;
//!
//! let array = npy_core::load("output.npy")?;
//! assert_eq!(array.shape()[..], [3, 3]);
//! assert_eq!(array.to_vec::<f32>()?[6..], [7.0, 8.0, 9.0]);
//!
//! // Compare against reference data
//! let similarity = npy_core::compare_similarity("output.npy", "golden.npy", 9)?;
//! println!("cosine similarity: {similarity:.6}");
//! # Ok::<(), npy_core::Error>(())
//! ```

#[cfg(test)]
#[macro_use]
pub(crate) mod approx;

pub mod array;
pub use array::{
    npy::{header::Header, load, save, Mode},
    Array, ArrayBuffer, Shape,
};

pub mod element;
pub use element::{Element, ElementType, Endian, TypeDescriptor};

pub mod error;
pub use error::{Error, Result};

pub mod similarity;
pub use similarity::{compare_similarity, cosine_similarity};
