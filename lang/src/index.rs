//! Symbolic iteration variables.
//!
//! An [`Index`] names one integer iteration variable of a contraction, or an
//! affine expression over such variables. Arithmetic on indexes builds the
//! affine sub-AST; comparing an index against a size records a range
//! constraint on the index itself, to be harvested when a contraction is
//! formed over it.

use std::cell::RefCell;
use std::rc::Rc;

use tessel_ir::affine::{ConstraintList, PolyExpr, PolyExprRef, PolyOpKind};
use tessel_ir::expr::ConstraintExpr;
use tessel_ir::next_index_id;

/// Sentinel returned by [`Index::lt`]; the constraint itself is recorded on
/// the index it was formed from.
pub struct Constraint;

struct IndexState {
    expr: PolyExprRef,
    /// Constraints accumulated through `lt`. Alive for as long as any handle
    /// to this index is; the affine leaves only hold weak references.
    constraints: Rc<ConstraintList>,
}

/// Handle to a symbolic iteration variable or an affine expression over
/// such.
///
/// Cloning shares the underlying variable: both handles denote the same
/// iteration variable and accumulate constraints together.
#[derive(Clone)]
pub struct Index {
    state: Rc<IndexState>,
}

impl Index {
    /// A fresh anonymous iteration variable.
    pub fn new() -> Self {
        Self::variable(None)
    }

    /// A fresh iteration variable carrying a user-visible name.
    pub fn named(name: impl Into<String>) -> Self {
        Self::variable(Some(name.into()))
    }

    fn variable(name: Option<String>) -> Self {
        let constraints = Rc::new(RefCell::new(Vec::new()));
        let expr = PolyExpr::index(next_index_id(), name, Rc::downgrade(&constraints));
        Self { state: Rc::new(IndexState { expr, constraints }) }
    }

    fn with_expr(expr: PolyExprRef) -> Self {
        Self { state: Rc::new(IndexState { expr, constraints: Rc::new(RefCell::new(Vec::new())) }) }
    }

    /// Record the range constraint `self < bound`.
    ///
    /// The constraint is attached to this index and surfaces in any later
    /// contraction whose access specs mention the index.
    pub fn lt(&self, bound: usize) -> Constraint {
        let constraint = Rc::new(ConstraintExpr { lhs: self.state.expr.clone(), rhs: bound });
        self.state.constraints.borrow_mut().push(constraint);
        Constraint
    }

    pub(crate) fn poly(&self) -> PolyExprRef {
        self.state.expr.clone()
    }

    fn poly_op(op: PolyOpKind, args: &[&Index]) -> Index {
        let operands = args.iter().map(|arg| arg.poly()).collect();
        Self::with_expr(PolyExpr::op(op, operands))
    }
}

impl Default for Index {
    fn default() -> Self {
        Self::new()
    }
}

impl From<i64> for Index {
    fn from(value: i64) -> Self {
        Self::with_expr(PolyExpr::literal(value))
    }
}

impl From<i32> for Index {
    fn from(value: i32) -> Self {
        Self::from(value as i64)
    }
}

macro_rules! impl_index_binop {
    ($trait:ident, $method:ident, $kind:ident) => {
        impl std::ops::$trait<&Index> for &Index {
            type Output = Index;

            fn $method(self, rhs: &Index) -> Index {
                Index::poly_op(PolyOpKind::$kind, &[self, rhs])
            }
        }

        impl std::ops::$trait<Index> for Index {
            type Output = Index;

            fn $method(self, rhs: Index) -> Index {
                (&self).$method(&rhs)
            }
        }

        impl std::ops::$trait<&Index> for Index {
            type Output = Index;

            fn $method(self, rhs: &Index) -> Index {
                (&self).$method(rhs)
            }
        }

        impl std::ops::$trait<Index> for &Index {
            type Output = Index;

            fn $method(self, rhs: Index) -> Index {
                self.$method(&rhs)
            }
        }

        impl std::ops::$trait<i64> for &Index {
            type Output = Index;

            fn $method(self, rhs: i64) -> Index {
                self.$method(&Index::from(rhs))
            }
        }

        impl std::ops::$trait<i64> for Index {
            type Output = Index;

            fn $method(self, rhs: i64) -> Index {
                (&self).$method(&Index::from(rhs))
            }
        }

        impl std::ops::$trait<&Index> for i64 {
            type Output = Index;

            fn $method(self, rhs: &Index) -> Index {
                (&Index::from(self)).$method(rhs)
            }
        }

        impl std::ops::$trait<Index> for i64 {
            type Output = Index;

            fn $method(self, rhs: Index) -> Index {
                (&Index::from(self)).$method(&rhs)
            }
        }
    };
}

impl_index_binop!(Add, add, Add);
impl_index_binop!(Sub, sub, Sub);
impl_index_binop!(Mul, mul, Mul);
impl_index_binop!(Div, div, Div);

impl std::ops::Neg for &Index {
    type Output = Index;

    fn neg(self) -> Index {
        Index::poly_op(PolyOpKind::Neg, &[self])
    }
}

impl std::ops::Neg for Index {
    type Output = Index;

    fn neg(self) -> Index {
        -&self
    }
}
