//! The tensor expression graph.
//!
//! Expressions form a DAG shared through `Rc`; sharing is the norm since
//! intermediate results feed multiple consumers. Every node carries a stable
//! id minted at construction, and all the identity-keyed machinery
//! (traversal dedup, binding maps, emitted-name maps) keys on it.
//!
//! Nodes are immutable once built, with one documented exception: the
//! builder phase may flip a contraction's `no_defract`, attach a
//! `use_default` expression, or set its carried name, all before lowering.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::affine::PolyExprRef;
use crate::next_expr_id;
use crate::shape::TensorShape;

pub type ExprRef = Rc<ExprNode>;
pub type ConstraintRef = Rc<ConstraintExpr>;

/// Reduction applied over the iteration domain of a contraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregationOp {
    Sum,
    Prod,
    Max,
    Min,
    Assign,
}

impl AggregationOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Sum => "+",
            Self::Prod => "*",
            Self::Max => ">",
            Self::Min => "<",
            Self::Assign => "=",
        }
    }
}

/// Elementwise combination of a contraction's inputs, applied before
/// aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CombinationOp {
    #[default]
    None,
    Plus,
    Multiply,
    Eq,
    Cond,
}

/// A named input tensor.
#[derive(Debug)]
pub struct ParamExpr {
    pub shape: TensorShape,
    pub name: String,
}

/// An elementwise or special function applied to argument expressions.
#[derive(Debug)]
pub struct CallExpr {
    pub fn_name: String,
    pub args: SmallVec<[ExprRef; 2]>,
}

/// One tensor access site inside a contraction: the accessed tensor plus an
/// affine index polynomial per dimension.
///
/// Output accesses additionally carry the declared output sizes (one per
/// index). Specs are structural children of a contraction and are never
/// evaluated as expressions in their own right.
#[derive(Debug)]
pub struct TensorSpecExpr {
    pub source: ExprRef,
    pub index_spec: SmallVec<[PolyExprRef; 4]>,
    pub output_sizes: Vec<usize>,
}

/// The inequality `lhs < rhs` over index variables.
#[derive(Debug)]
pub struct ConstraintExpr {
    pub lhs: PolyExprRef,
    pub rhs: usize,
}

#[derive(Debug)]
pub struct ContractionExpr {
    pub agg_op: AggregationOp,
    pub combo_op: CombinationOp,
    /// Output access; kind is always `TensorSpec`.
    pub output: ExprRef,
    /// Input accesses; each kind is always `TensorSpec`.
    pub inputs: Vec<ExprRef>,
    pub constraints: Vec<ConstraintRef>,
    // Builder-phase knobs, settled before lowering.
    pub no_defract: Cell<bool>,
    pub use_default: RefCell<Option<ExprRef>>,
    pub name: RefCell<Option<String>>,
}

#[derive(Debug)]
pub enum ExprKind {
    Param(ParamExpr),
    IntConst(i64),
    FloatConst(f64),
    Call(CallExpr),
    TensorSpec(TensorSpecExpr),
    Contraction(ContractionExpr),
}

#[derive(Debug)]
pub struct ExprNode {
    id: u64,
    kind: ExprKind,
}

impl ExprNode {
    fn new(kind: ExprKind) -> ExprRef {
        Rc::new(Self { id: next_expr_id(), kind })
    }

    /// Stable identity of this node; never reused within a thread.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> &ExprKind {
        &self.kind
    }

    pub fn param(shape: TensorShape, name: impl Into<String>) -> ExprRef {
        Self::new(ExprKind::Param(ParamExpr { shape, name: name.into() }))
    }

    pub fn int_const(value: i64) -> ExprRef {
        Self::new(ExprKind::IntConst(value))
    }

    pub fn float_const(value: f64) -> ExprRef {
        Self::new(ExprKind::FloatConst(value))
    }

    pub fn call(fn_name: impl Into<String>, args: Vec<ExprRef>) -> ExprRef {
        Self::new(ExprKind::Call(CallExpr { fn_name: fn_name.into(), args: SmallVec::from_vec(args) }))
    }

    pub fn tensor_spec(
        source: ExprRef,
        index_spec: Vec<PolyExprRef>,
        output_sizes: Vec<usize>,
    ) -> ExprRef {
        Self::new(ExprKind::TensorSpec(TensorSpecExpr {
            source,
            index_spec: SmallVec::from_vec(index_spec),
            output_sizes,
        }))
    }

    pub fn contraction(cion: ContractionExpr) -> ExprRef {
        Self::new(ExprKind::Contraction(cion))
    }

    pub fn as_call(&self) -> Option<&CallExpr> {
        match &self.kind {
            ExprKind::Call(call) => Some(call),
            _ => None,
        }
    }

    pub fn as_tensor_spec(&self) -> Option<&TensorSpecExpr> {
        match &self.kind {
            ExprKind::TensorSpec(spec) => Some(spec),
            _ => None,
        }
    }

    pub fn as_contraction(&self) -> Option<&ContractionExpr> {
        match &self.kind {
            ExprKind::Contraction(cion) => Some(cion),
            _ => None,
        }
    }

    /// The user-visible name of this node, if it has one.
    ///
    /// Parameters carry the name they were declared with; contractions carry
    /// the name propagated from the tensor they were assigned into.
    pub fn user_name(&self) -> Option<String> {
        match &self.kind {
            ExprKind::Param(param) if !param.name.is_empty() => Some(param.name.clone()),
            ExprKind::Contraction(cion) => cion.name.borrow().clone(),
            _ => None,
        }
    }

    /// Traversal children, in processing order.
    ///
    /// Calls yield their arguments left to right. Contractions yield their
    /// default expression (when set) followed by the accessed input tensors;
    /// the specs themselves are structural, not children.
    pub fn children(&self) -> SmallVec<[ExprRef; 4]> {
        match &self.kind {
            ExprKind::Param(_)
            | ExprKind::IntConst(_)
            | ExprKind::FloatConst(_)
            | ExprKind::TensorSpec(_) => SmallVec::new(),
            ExprKind::Call(call) => call.args.iter().cloned().collect(),
            ExprKind::Contraction(cion) => {
                let mut children = SmallVec::new();
                children.extend(cion.use_default.borrow().clone());
                children.extend(
                    cion.inputs.iter().filter_map(|input| input.as_tensor_spec()).map(|spec| spec.source.clone()),
                );
                children
            }
        }
    }
}

impl fmt::Display for ExprNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Param(param) => write!(f, "param({})", param.name),
            ExprKind::IntConst(value) => write!(f, "{value}"),
            ExprKind::FloatConst(value) => write!(f, "{value}"),
            ExprKind::Call(call) => write!(f, "{}/{}", call.fn_name, call.args.len()),
            ExprKind::TensorSpec(spec) => write!(f, "spec[{}]", spec.index_spec.len()),
            ExprKind::Contraction(cion) => write!(f, "cion({})", cion.agg_op.symbol()),
        }
    }
}
