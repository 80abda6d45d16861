//! Tensor shapes: ordered dimensions with explicit strides plus an element
//! type.

use std::fmt;

use tessel_dtype::DataType;

/// A single axis: logical size and element stride.
///
/// Strides are signed; broadcasting and layout transforms may produce strides
/// that do not match the row-major derivation from sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dimension {
    pub size: usize,
    pub stride: i64,
}

/// Shape of a tensor value: element type plus ordered dimensions.
///
/// A scalar has an empty dimension list. The default shape (`Invalid`, no
/// dims) is what non-tensor bindings report when asked for one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TensorShape {
    pub dtype: DataType,
    pub dims: Vec<Dimension>,
}

impl TensorShape {
    pub fn new(dtype: DataType, dims: Vec<Dimension>) -> Self {
        Self { dtype, dims }
    }

    pub fn scalar(dtype: DataType) -> Self {
        Self { dtype, dims: Vec::new() }
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    pub fn sizes(&self) -> Vec<usize> {
        self.dims.iter().map(|dim| dim.size).collect()
    }
}

impl fmt::Display for TensorShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}[", self.dtype)?;
        for (i, dim) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}:{}", dim.size, dim.stride)?;
        }
        write!(f, "]")
    }
}

/// Build a densely packed row-major shape from dimension sizes.
pub fn simple_shape(dtype: DataType, sizes: &[usize]) -> TensorShape {
    let mut dims = vec![Dimension { size: 0, stride: 0 }; sizes.len()];
    let mut stride = 1i64;
    for (dim, &size) in dims.iter_mut().zip(sizes).rev() {
        *dim = Dimension { size, stride };
        stride *= size as i64;
    }
    TensorShape { dtype, dims }
}
