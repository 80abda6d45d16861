//! Folding affine index trees into canonical polynomials.
//!
//! One evaluator instance serves every spec and constraint of a single
//! contraction, so that an index variable appearing across the output and
//! input specs resolves to one polynomial variable. Anonymous indexes get
//! fresh names `x0, x1, …`, memoized by the owning index's identity.

use std::collections::HashMap;

use num_traits::Zero;

use tessel_ir::affine::{PolyExpr, PolyExprRef, PolyOpKind};
use tessel_ir::poly::Polynomial;

use crate::error::{
    DivisionByZeroSnafu, NonConstantDivisorSnafu, NonLinearPolynomialSnafu, PolyOperandCountSnafu,
    Result,
};

#[derive(Default)]
pub struct PolyEvaluator {
    seen: HashMap<u64, String>,
    next: usize,
}

impl PolyEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Canonicalize one affine index tree.
    ///
    /// Affinity is enforced here: multiplication needs a constant operand,
    /// division a non-zero constant divisor.
    pub fn evaluate(&mut self, expr: &PolyExprRef) -> Result<Polynomial> {
        match &**expr {
            PolyExpr::Literal(value) => Ok(Polynomial::from(*value)),
            PolyExpr::Index(leaf) => {
                let name = self.seen.entry(leaf.owner()).or_insert_with(|| {
                    leaf.name().map(str::to_string).unwrap_or_else(|| {
                        let name = format!("x{}", self.next);
                        self.next += 1;
                        name
                    })
                });
                Ok(Polynomial::index(name))
            }
            PolyExpr::Op { op, operands } => {
                if *op == PolyOpKind::Neg {
                    snafu::ensure!(
                        operands.len() == 1,
                        PolyOperandCountSnafu { op: *op, actual: operands.len() }
                    );
                    return Ok(-self.evaluate(&operands[0])?);
                }
                snafu::ensure!(
                    operands.len() == 2,
                    PolyOperandCountSnafu { op: *op, actual: operands.len() }
                );
                let lhs = self.evaluate(&operands[0])?;
                let rhs = self.evaluate(&operands[1])?;
                match op {
                    PolyOpKind::Add => Ok(lhs + rhs),
                    PolyOpKind::Sub => Ok(lhs - rhs),
                    PolyOpKind::Mul => {
                        if lhs.is_constant() {
                            Ok(rhs * lhs.constant_value())
                        } else if rhs.is_constant() {
                            Ok(lhs * rhs.constant_value())
                        } else {
                            NonLinearPolynomialSnafu.fail()
                        }
                    }
                    PolyOpKind::Div => {
                        snafu::ensure!(rhs.is_constant(), NonConstantDivisorSnafu);
                        let divisor = rhs.constant_value();
                        snafu::ensure!(!divisor.is_zero(), DivisionByZeroSnafu);
                        Ok(lhs / divisor)
                    }
                    PolyOpKind::Neg => unreachable!("handled above"),
                }
            }
        }
    }
}
