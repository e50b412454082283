//! Array shapes and the rule for stacking them along the leading axis.

use std::{fmt, ops::Deref};

use crate::error::AppendMismatch;

/// The shape of an array.
///
/// An empty shape denotes a scalar, which holds a single element.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct Shape(pub Vec<usize>);

impl Shape {
    /// Returns the number of elements in an array of this shape.
    ///
    /// This is the product of the dimensions, so a scalar shape has a single element.
    pub fn elements(&self) -> usize {
        self.iter().product()
    }

    /// Returns the number of elements, or `None` if the product overflows.
    pub fn checked_elements(&self) -> Option<usize> {
        self.iter().try_fold(1usize, |acc, &v| acc.checked_mul(v))
    }

    /// Returns the size of the leading axis, or `None` for a scalar shape.
    pub fn leading(&self) -> Option<usize> {
        self.first().copied()
    }

    /// Returns a shape with a single dimension.
    pub fn flat(n: usize) -> Self {
        Self(vec![n])
    }

    /// Returns the empty, scalar shape.
    pub fn scalar() -> Self {
        Self(Vec::new())
    }

    /// Returns the shape obtained by stacking `other` after `self` along the leading axis.
    pub(crate) fn stack(&self, other: &Shape) -> Result<Shape, AppendMismatch> {
        if self.len() != other.len() {
            return Err(AppendMismatch::Rank {
                existing: self.len(),
                new: other.len(),
            });
        }

        let (Some(&leading), Some(&added)) = (self.first(), other.first()) else {
            return Err(AppendMismatch::Scalar);
        };

        if let Some((axis, (&existing, &new))) = self
            .iter()
            .zip(other.iter())
            .enumerate()
            .skip(1)
            .find(|(_, (x, y))| x != y)
        {
            return Err(AppendMismatch::Dimension {
                axis,
                existing,
                new,
            });
        }

        let merged = leading
            .checked_add(added)
            .ok_or(AppendMismatch::LeadingOverflow {
                existing: leading,
                new: added,
            })?;

        let mut stacked = self.clone();
        stacked.0[0] = merged;
        Ok(stacked)
    }
}

impl AsRef<[usize]> for Shape {
    fn as_ref(&self) -> &[usize] {
        self
    }
}

impl Deref for Shape {
    type Target = [usize];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<usize>> for Shape {
    fn from(shape: Vec<usize>) -> Self {
        Self(shape)
    }
}

impl From<&[usize]> for Shape {
    fn from(shape: &[usize]) -> Self {
        Self(shape.to_vec())
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(shape: [usize; N]) -> Self {
        Self(shape.to_vec())
    }
}

impl From<usize> for Shape {
    fn from(n: usize) -> Self {
        Self::flat(n)
    }
}

/// Formats the shape as a Python tuple, as used in the npy header.
///
/// A single dimension gets a trailing comma, so that `(5,)` is not read as a parenthesised
/// scalar.
impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_ref() {
            [] => f.write_str("()"),
            [n] => write!(f, "({n},)"),
            [first, rest @ ..] => {
                write!(f, "({first}")?;
                for v in rest {
                    write!(f, ", {v}")?;
                }
                f.write_str(")")
            }
        }
    }
}
