//! The user-facing builder API.
//!
//! [`Tensor`] handles wrap shared expression nodes; arithmetic on tensors
//! grows the expression DAG, indexing with [`Index`] variables produces
//! [`Access`] handles, and compound assignment over accesses forms
//! contractions. [`evaluate`] lowers the finished graph into a flat program
//! for the downstream compiler.

use std::cell::RefCell;
use std::rc::Rc;

use snafu::{ResultExt, ensure};

use tessel_ir::expr::{ExprKind, ExprNode, ExprRef};
use tessel_ir::infer::evaluate_shape;
use tessel_ir::shape::TensorShape;
use tessel_lower::RunInfo;

pub mod access;
pub mod error;
pub mod index;
pub mod ops;
pub mod traits;

#[cfg(test)]
pub mod test;

pub use access::{Access, cond};
pub use error::{Error, Result};
pub use index::{Constraint, Index};

use error::{
    DimOutOfRangeSnafu, InputRankMismatchSnafu, IrSnafu, LowerSnafu, NotAContractionSnafu,
    OutputArityMismatchSnafu,
};

/// Mutable handle over a single expression node.
///
/// The handle is value-like: cloning snapshots the current binding, so a
/// later contraction formed through one handle leaves the other untouched.
/// The expression nodes themselves are shared and immutable.
pub struct Tensor {
    expr: Rc<RefCell<ExprRef>>,
}

impl Clone for Tensor {
    fn clone(&self) -> Self {
        Self::from_expr(self.expr())
    }
}

impl Tensor {
    pub(crate) fn from_expr(expr: ExprRef) -> Self {
        Self { expr: Rc::new(RefCell::new(expr)) }
    }

    /// A named input tensor with a known shape.
    pub fn new(shape: TensorShape, name: impl Into<String>) -> Self {
        Self::from_expr(ExprNode::param(shape, name))
    }

    /// A named placeholder without a shape, typically the destination of a
    /// contraction.
    pub fn param(name: impl Into<String>) -> Self {
        Self::from_expr(ExprNode::param(TensorShape::default(), name))
    }

    /// The expression currently bound to this handle.
    pub fn expr(&self) -> ExprRef {
        self.expr.borrow().clone()
    }

    /// Infer the shape of the bound expression.
    pub fn shape(&self) -> Result<TensorShape> {
        evaluate_shape(&self.expr()).context(IrSnafu)
    }

    /// Size of the `dim`-th dimension, inferring the shape if necessary.
    pub fn dims(&self, dim: usize) -> Result<usize> {
        let shape = self.shape()?;
        ensure!(dim < shape.rank(), DimOutOfRangeSnafu { dim, rank: shape.rank() });
        Ok(shape.dims[dim].size)
    }

    /// Read access: one index expression per dimension of the current shape.
    pub fn index(&self, idxs: &[Index]) -> Result<Access> {
        let shape = self.shape()?;
        ensure!(
            idxs.len() == shape.rank(),
            InputRankMismatchSnafu { expected: shape.rank(), actual: idxs.len() }
        );
        let index_spec = idxs.iter().map(Index::poly).collect();
        let spec = ExprNode::tensor_spec(self.expr(), index_spec, Vec::new());
        Ok(Access::from_spec(spec, self.expr.clone()))
    }

    /// Output access: index expressions paired with declared output sizes.
    pub fn index_out(&self, idxs: &[Index], sizes: &[usize]) -> Result<Access> {
        ensure!(
            idxs.len() == sizes.len(),
            OutputArityMismatchSnafu { indices: idxs.len(), sizes: sizes.len() }
        );
        let index_spec = idxs.iter().map(Index::poly).collect();
        let spec = ExprNode::tensor_spec(self.expr(), index_spec, sizes.to_vec());
        Ok(Access::from_spec(spec, self.expr.clone()))
    }

    /// Disable defractionalization for the bound contraction.
    pub fn no_defract(&self) -> Result<&Self> {
        let expr = self.expr.borrow();
        let cion = expr
            .as_contraction()
            .ok_or_else(|| NotAContractionSnafu { method: "no_defract" }.build())?;
        cion.no_defract.set(true);
        Ok(self)
    }

    /// Value to substitute where the bound contraction writes nothing.
    pub fn use_default(&self, rhs: &Tensor) -> Result<&Self> {
        let expr = self.expr.borrow();
        let cion = expr
            .as_contraction()
            .ok_or_else(|| NotAContractionSnafu { method: "use_default" }.build())?;
        *cion.use_default.borrow_mut() = Some(rhs.expr());
        Ok(self)
    }

    /// True when the handle is currently bound to a contraction.
    pub fn is_contraction(&self) -> bool {
        matches!(self.expr.borrow().kind(), ExprKind::Contraction(_))
    }
}

impl From<i32> for Tensor {
    fn from(value: i32) -> Self {
        Self::from_expr(ExprNode::int_const(value as i64))
    }
}

impl From<i64> for Tensor {
    fn from(value: i64) -> Self {
        Self::from_expr(ExprNode::int_const(value))
    }
}

impl From<f64> for Tensor {
    fn from(value: f64) -> Self {
        Self::from_expr(ExprNode::float_const(value))
    }
}

/// Apply a named function to tensor arguments.
///
/// This is the escape hatch for the registered special operations
/// (`reshape`, `gather`, `prng_step`, …) as well as anything the operator
/// surface does not cover.
pub fn call(fn_name: &str, args: &[Tensor]) -> Tensor {
    let exprs = args.iter().map(Tensor::expr).collect();
    Tensor::from_expr(ExprNode::call(fn_name, exprs))
}

/// Lower the graphs reachable from `outputs` into a named flat program.
pub fn evaluate(name: impl Into<String>, outputs: &[Tensor]) -> Result<RunInfo> {
    let exprs: Vec<ExprRef> = outputs.iter().map(Tensor::expr).collect();
    tessel_lower::emit_program(name, &exprs).context(LowerSnafu)
}
