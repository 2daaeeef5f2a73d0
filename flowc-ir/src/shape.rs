//! Tensor shapes: an ordered sequence of dimensions where `-1` stands for
//! a dimension that is not known until runtime.

use smallvec::SmallVec;

/// The shape of a tensor variable.
///
/// A freshly created shape is *undefined*: no rank is known at all. This
/// is different from a *scalar*, which has a known rank of zero. Adding
/// dimensions (or constructing from a dimension list) makes the shape
/// defined.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Shape {
    dims: SmallVec<[i32; 4]>,
    defined: bool,
}

impl Shape {
    /// An undefined shape with no known rank.
    pub fn undefined() -> Self {
        Shape::default()
    }

    /// A defined shape of rank zero.
    pub fn scalar() -> Self {
        Shape {
            dims: SmallVec::new(),
            defined: true,
        }
    }

    /// A defined shape with the given dimensions.
    pub fn new(dims: &[i32]) -> Self {
        Shape {
            dims: SmallVec::from_slice(dims),
            defined: true,
        }
    }

    /// Append a dimension; defines the shape.
    pub fn add_dim(&mut self, size: i32) {
        self.defined = true;
        self.dims.push(size);
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    pub fn dim(&self, d: usize) -> i32 {
        self.dims[d]
    }

    pub fn dims(&self) -> &[i32] {
        &self.dims
    }

    /// True when no rank has ever been assigned.
    pub fn is_undefined(&self) -> bool {
        !self.defined
    }

    /// True for a defined shape of rank zero.
    pub fn is_scalar(&self) -> bool {
        self.defined && self.dims.is_empty()
    }

    /// True when any dimension is unknown.
    pub fn is_partial(&self) -> bool {
        self.dims.iter().any(|&d| d < 0)
    }

    /// Total number of elements, or `None` when the shape is partial or
    /// undefined.
    pub fn elements(&self) -> Option<usize> {
        if !self.defined || self.is_partial() {
            return None;
        }
        Some(self.dims.iter().map(|&d| d as usize).product())
    }

    /// Shapes are the same size when they have equal rank and each pair of
    /// dimensions is equal or at least one of the pair is unknown.
    pub fn is_same_size(&self, other: &Shape) -> bool {
        if self.rank() != other.rank() {
            return false;
        }
        self.dims
            .iter()
            .zip(other.dims.iter())
            .all(|(&a, &b)| a == b || a == -1 || b == -1)
    }

    /// The number of elements in the longest common suffix of the two
    /// shapes.
    pub fn common_size(&self, other: &Shape) -> i64 {
        let mut n: i64 = 1;
        for (&a, &b) in self
            .dims
            .iter()
            .rev()
            .zip(other.dims.iter().rev())
        {
            if a != b {
                break;
            }
            n *= a as i64;
        }
        n
    }
}

impl From<&[i32]> for Shape {
    fn from(dims: &[i32]) -> Self {
        Shape::new(dims)
    }
}

/// Renders as `2x3x4` with `?` for unknown dimensions. Scalars and
/// undefined shapes render as the empty string.
impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (d, &size) in self.dims.iter().enumerate() {
            if d > 0 {
                f.write_str("x")?;
            }
            if size == -1 {
                f.write_str("?")?;
            } else {
                write!(f, "{}", size)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undefined_vs_scalar() {
        let undef = Shape::undefined();
        let scalar = Shape::scalar();
        assert!(undef.is_undefined());
        assert!(!undef.is_scalar());
        assert!(!scalar.is_undefined());
        assert!(scalar.is_scalar());
        assert_ne!(undef, scalar);

        let mut s = Shape::undefined();
        s.add_dim(3);
        assert!(!s.is_undefined());
        assert_eq!(s.rank(), 1);
    }

    #[test]
    fn elements() {
        assert_eq!(Shape::new(&[2, 3, 4]).elements(), Some(24));
        assert_eq!(Shape::scalar().elements(), Some(1));
        assert_eq!(Shape::new(&[2, -1]).elements(), None);
        assert_eq!(Shape::undefined().elements(), None);
    }

    #[test]
    fn same_size() {
        assert!(Shape::new(&[2, 3]).is_same_size(&Shape::new(&[2, 3])));
        assert!(Shape::new(&[2, -1]).is_same_size(&Shape::new(&[2, 7])));
        assert!(!Shape::new(&[2, 3]).is_same_size(&Shape::new(&[2, 4])));
        assert!(!Shape::new(&[2, 3]).is_same_size(&Shape::new(&[2, 3, 1])));
    }

    #[test]
    fn common_size() {
        let a = Shape::new(&[8, 2, 3]);
        let b = Shape::new(&[5, 2, 3]);
        assert_eq!(a.common_size(&b), 6);
        let c = Shape::new(&[2, 3]);
        assert_eq!(a.common_size(&c), 6);
        let d = Shape::new(&[7]);
        assert_eq!(a.common_size(&d), 1);
    }

    #[test]
    fn display() {
        assert_eq!(Shape::new(&[2, -1, 4]).to_string(), "2x?x4");
        assert_eq!(Shape::scalar().to_string(), "");
    }
}
