use std::cell::Cell;

pub mod affine;
pub mod binding;
pub mod error;
pub mod expr;
pub mod infer;
pub mod poly;
pub mod registry;
pub mod shape;
pub mod traverse;

#[cfg(test)]
pub mod test;

pub use affine::{PolyExpr, PolyExprRef, PolyIndex, PolyOpKind};
pub use binding::Binding;
pub use error::{Error, Result};
pub use expr::{
    AggregationOp, CallExpr, CombinationOp, ConstraintExpr, ConstraintRef, ContractionExpr,
    ExprKind, ExprNode, ExprRef, ParamExpr, TensorSpecExpr,
};
pub use poly::{Polynomial, RangeConstraint};
pub use registry::{K_RNG_SIZE, SpecialOp, SpecialOpRegistry};
pub use shape::{Dimension, TensorShape, simple_shape};

// Thread-local counters for stable node identities.
//
// Expression nodes and index variables are shared through Rc and compared by
// identity in traversal, inference and polynomial evaluation. Monotonic ids
// sidestep the ABA hazard of raw pointer keys; Cell keeps the builder
// single-threaded by construction.
thread_local! {
    static EXPR_ID_COUNTER: Cell<u64> = const { Cell::new(0) };
    static INDEX_ID_COUNTER: Cell<u64> = const { Cell::new(0) };
}

pub(crate) fn next_expr_id() -> u64 {
    EXPR_ID_COUNTER.with(|counter| {
        let id = counter.get();
        counter.set(id + 1);
        id
    })
}

/// Mint a stable identity for a new index variable.
///
/// Exposed so the builder layer can tie its `Index` handles to the
/// [`PolyIndex`] leaves that reference them.
pub fn next_index_id() -> u64 {
    INDEX_ID_COUNTER.with(|counter| {
        let id = counter.get();
        counter.set(id + 1);
        id
    })
}
