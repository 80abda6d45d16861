//! The affine index sub-language.
//!
//! Index expressions inside contractions form their own small AST, disjoint
//! from the tensor expression graph: an index variable, an integer literal,
//! or an arithmetic node over those. Lowering folds these trees into
//! canonical [`Polynomial`](crate::poly::Polynomial) form and rejects
//! anything non-affine.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use smallvec::SmallVec;

use crate::expr::ConstraintRef;

pub type PolyExprRef = Rc<PolyExpr>;

/// Shared, growable list of range constraints owned by one index handle.
pub type ConstraintList = RefCell<Vec<ConstraintRef>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolyOpKind {
    Neg,
    Add,
    Sub,
    Mul,
    Div,
}

impl PolyOpKind {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Neg | Self::Sub => "-",
            Self::Add => "+",
            Self::Mul => "*",
            Self::Div => "/",
        }
    }
}

/// A leaf referencing an index variable.
///
/// `owner` is the stable identity of the index handle that minted this leaf;
/// polynomial evaluation unifies leaves by it. The back-reference to the
/// owner's constraint list is deliberately weak: it exists only so
/// contraction construction can harvest constraints, and must not keep the
/// handle alive.
#[derive(Debug)]
pub struct PolyIndex {
    owner: u64,
    name: Option<String>,
    constraints: Weak<ConstraintList>,
}

impl PolyIndex {
    pub fn owner(&self) -> u64 {
        self.owner
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The owner's constraint list, if the owning index handle is still
    /// alive.
    pub fn constraints(&self) -> Option<Rc<ConstraintList>> {
        self.constraints.upgrade()
    }
}

#[derive(Debug)]
pub enum PolyExpr {
    Index(PolyIndex),
    Literal(i64),
    Op { op: PolyOpKind, operands: SmallVec<[PolyExprRef; 2]> },
}

impl PolyExpr {
    pub fn index(owner: u64, name: Option<String>, constraints: Weak<ConstraintList>) -> PolyExprRef {
        Rc::new(PolyExpr::Index(PolyIndex { owner, name, constraints }))
    }

    /// An index leaf with no live owner; useful where constraints are
    /// irrelevant.
    pub fn anonymous_index(owner: u64) -> PolyExprRef {
        Self::index(owner, None, Weak::new())
    }

    pub fn literal(value: i64) -> PolyExprRef {
        Rc::new(PolyExpr::Literal(value))
    }

    pub fn op(op: PolyOpKind, operands: Vec<PolyExprRef>) -> PolyExprRef {
        Rc::new(PolyExpr::Op { op, operands: SmallVec::from_vec(operands) })
    }
}

impl fmt::Display for PolyExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolyExpr::Index(idx) => match idx.name() {
                Some(name) => write!(f, "{name}"),
                None => write!(f, "i{}", idx.owner),
            },
            PolyExpr::Literal(value) => write!(f, "{value}"),
            PolyExpr::Op { op, operands } => {
                if operands.len() == 1 {
                    write!(f, "({}{})", op.symbol(), operands[0])
                } else {
                    write!(f, "(")?;
                    for (i, operand) in operands.iter().enumerate() {
                        if i > 0 {
                            write!(f, " {} ", op.symbol())?;
                        }
                        write!(f, "{operand}")?;
                    }
                    write!(f, ")")
                }
            }
        }
    }
}
