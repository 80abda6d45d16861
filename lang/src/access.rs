//! Tensor access handles and contraction formation.
//!
//! An [`Access`] is produced by indexing a tensor with iteration variables.
//! Accesses compose elementwise (`+`, `*`, [`Access::eq`], [`cond`]) to
//! describe how a contraction combines its inputs, and compound assignment
//! onto an output access forms the contraction itself, rebinding the
//! destination tensor.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;

use snafu::ensure;

use tessel_ir::affine::{PolyExpr, PolyExprRef};
use tessel_ir::expr::{
    AggregationOp, CombinationOp, ConstraintExpr, ConstraintRef, ContractionExpr, ExprKind,
    ExprNode, ExprRef,
};

use crate::error::{
    InputNotSpecSnafu, InvalidCombinationSnafu, InvalidContractionRhsSnafu, OutputNotSpecSnafu,
    Result,
};

/// A single tensor access: either the read or the write face of a
/// contraction, or an elementwise combination of reads.
pub struct Access {
    expr: ExprRef,
    /// Present when this access was formed directly from a tensor; forming a
    /// contraction rebinds the tensor through this cell.
    dest: Option<Rc<RefCell<ExprRef>>>,
}

impl Access {
    pub(crate) fn from_spec(expr: ExprRef, dest: Rc<RefCell<ExprRef>>) -> Self {
        Self { expr, dest: Some(dest) }
    }

    /// The expression this access denotes.
    pub fn expr(&self) -> &ExprRef {
        &self.expr
    }

    fn make_call(&self, fn_name: &str, rhs: &Access) -> Access {
        Access {
            expr: ExprNode::call(fn_name, vec![self.expr.clone(), rhs.expr.clone()]),
            dest: None,
        }
    }

    /// Elementwise equality between two accesses, usable as a contraction
    /// combination. Distinct from tensor comparison, which yields a
    /// `cmp_eq` call.
    pub fn eq(&self, rhs: &Access) -> Access {
        self.make_call("eq", rhs)
    }

    /// Form a contraction `self <agg_op>= rhs` and rebind the destination
    /// tensor to it.
    pub fn aggregate(&mut self, agg_op: AggregationOp, rhs: &Access) -> Result<()> {
        ensure!(matches!(self.expr.kind(), ExprKind::TensorSpec(_)), OutputNotSpecSnafu);
        let dest = self.dest.as_ref().ok_or_else(|| OutputNotSpecSnafu.build())?;

        let (combo_op, inputs): (CombinationOp, Vec<ExprRef>) = match rhs.expr.kind() {
            ExprKind::TensorSpec(_) => (CombinationOp::None, vec![rhs.expr.clone()]),
            ExprKind::Call(call) => {
                let combo_op = match call.fn_name.as_str() {
                    "add" => CombinationOp::Plus,
                    "mul" => CombinationOp::Multiply,
                    "eq" => CombinationOp::Eq,
                    "cond" => CombinationOp::Cond,
                    other => {
                        return InvalidCombinationSnafu { fn_name: other.to_string() }.fail();
                    }
                };
                for arg in &call.args {
                    ensure!(matches!(arg.kind(), ExprKind::TensorSpec(_)), InputNotSpecSnafu);
                }
                (combo_op, call.args.to_vec())
            }
            _ => return InvalidContractionRhsSnafu.fail(),
        };

        let mut collector = ConstraintCollector::default();
        if let Some(output_spec) = self.expr.as_tensor_spec() {
            for poly in &output_spec.index_spec {
                collector.visit(poly);
            }
        }
        for spec in inputs.iter().filter_map(|input| input.as_tensor_spec()) {
            for poly in &spec.index_spec {
                collector.visit(poly);
            }
        }

        // A named parameter on the left-hand side passes its name on.
        let name = match dest.borrow().kind() {
            ExprKind::Param(param) if !param.name.is_empty() => Some(param.name.clone()),
            _ => None,
        };

        let cion = ExprNode::contraction(ContractionExpr {
            agg_op,
            combo_op,
            output: self.expr.clone(),
            inputs,
            constraints: collector.constraints,
            no_defract: Cell::new(false),
            use_default: RefCell::new(None),
            name: RefCell::new(name),
        });
        *dest.borrow_mut() = cion;
        Ok(())
    }

    pub fn maximize(&mut self, rhs: &Access) -> Result<()> {
        self.aggregate(AggregationOp::Max, rhs)
    }

    pub fn minimize(&mut self, rhs: &Access) -> Result<()> {
        self.aggregate(AggregationOp::Min, rhs)
    }

    pub fn assign(&mut self, rhs: &Access) -> Result<()> {
        self.aggregate(AggregationOp::Assign, rhs)
    }
}

/// Elementwise conditional over accesses: where `lhs == rhs`, take
/// `true_case`.
pub fn cond(lhs: &Access, rhs: &Access, true_case: &Access) -> Access {
    Access {
        expr: ExprNode::call(
            "cond",
            vec![lhs.expr.clone(), rhs.expr.clone(), true_case.expr.clone()],
        ),
        dest: None,
    }
}

impl std::ops::Add<&Access> for &Access {
    type Output = Access;

    fn add(self, rhs: &Access) -> Access {
        self.make_call("add", rhs)
    }
}

impl std::ops::Add<Access> for Access {
    type Output = Access;

    fn add(self, rhs: Access) -> Access {
        (&self).make_call("add", &rhs)
    }
}

impl std::ops::Mul<&Access> for &Access {
    type Output = Access;

    fn mul(self, rhs: &Access) -> Access {
        self.make_call("mul", rhs)
    }
}

impl std::ops::Mul<Access> for Access {
    type Output = Access;

    fn mul(self, rhs: Access) -> Access {
        (&self).make_call("mul", &rhs)
    }
}

impl std::ops::AddAssign<Access> for Access {
    /// `output += rhs`: sum-aggregation contraction.
    #[track_caller]
    fn add_assign(&mut self, rhs: Access) {
        self.aggregate(AggregationOp::Sum, &rhs).expect("contraction formation failed");
    }
}

impl std::ops::MulAssign<Access> for Access {
    /// `output *= rhs`: product-aggregation contraction.
    #[track_caller]
    fn mul_assign(&mut self, rhs: Access) {
        self.aggregate(AggregationOp::Prod, &rhs).expect("contraction formation failed");
    }
}

/// Harvests the range constraints of every index referenced by a set of
/// access specs, deduplicated by constraint identity.
#[derive(Default)]
struct ConstraintCollector {
    seen: HashSet<*const ConstraintExpr>,
    constraints: Vec<ConstraintRef>,
}

impl ConstraintCollector {
    fn visit(&mut self, poly: &PolyExprRef) {
        match &**poly {
            PolyExpr::Index(leaf) => {
                if let Some(list) = leaf.constraints() {
                    for constraint in list.borrow().iter() {
                        if self.seen.insert(Rc::as_ptr(constraint)) {
                            self.constraints.push(constraint.clone());
                        }
                    }
                }
            }
            PolyExpr::Literal(_) => {}
            PolyExpr::Op { operands, .. } => {
                for operand in operands {
                    self.visit(operand);
                }
            }
        }
    }
}
