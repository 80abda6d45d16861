//! Inferred per-node values: a shape for tensors, a literal for constants.

use tessel_dtype::DataType;

use crate::shape::TensorShape;

/// The value-like annotation attached to every expression during shape
/// inference.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Tensor(TensorShape),
    IConst(i64),
    FConst { value: f64, dtype: DataType },
    Tuple(Vec<Binding>),
}

impl Binding {
    pub fn shape(&self) -> Option<&TensorShape> {
        match self {
            Binding::Tensor(shape) => Some(shape),
            _ => None,
        }
    }

    /// The shape of this binding, or the default (invalid, rank-0) shape for
    /// non-tensor bindings.
    pub fn shape_or_default(&self) -> TensorShape {
        self.shape().cloned().unwrap_or_default()
    }

    pub fn as_iconst(&self) -> Option<i64> {
        match self {
            Binding::IConst(value) => Some(*value),
            _ => None,
        }
    }
}
