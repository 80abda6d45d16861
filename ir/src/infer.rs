//! Shape and dtype inference over a linearized expression graph.
//!
//! Inference walks the flat node sequence bottom-up and records a
//! [`Binding`] per node id. Calls either dispatch to a registered
//! special-op rule or fall back to NumPy-style elementwise broadcasting.

use std::collections::HashMap;

use tessel_dtype::DataType;

use crate::binding::Binding;
use crate::error::{
    BroadcastMismatchSnafu, ContractionInputSnafu, MalformedContractionSnafu, MissingBindingSnafu,
    Result, UnexpectedTensorSpecSnafu, UnsupportedBindingSnafu,
};
use crate::expr::{CombinationOp, ExprKind, ExprRef};
use crate::registry::SpecialOpRegistry;
use crate::shape::{TensorShape, simple_shape};
use crate::traverse::linearize;

/// Fold one input shape into the accumulated broadcast result.
///
/// Dimensions align from the right; a size-1 dimension stretches to match
/// its partner, and leading dimensions of the longer shape carry over
/// verbatim. Returns whether the accumulator changed shape (callers
/// recompute strides once any fold reports true). Scalars broadcast to
/// anything and never change the result.
pub fn merge_shapes(into: &mut TensorShape, shape: &TensorShape) -> Result<bool> {
    if shape.dims.is_empty() {
        return Ok(false);
    }
    if into.dims.is_empty() {
        into.dims = shape.dims.clone();
        return Ok(false);
    }
    if into.dims == shape.dims {
        return Ok(false);
    }

    let mut dst = into.dims.len();
    let mut src = shape.dims.len();
    loop {
        if src == 0 {
            break;
        }
        if dst == 0 {
            // The remaining leading dimensions of `shape` extend the result.
            let leading: Vec<_> = shape.dims[..src].to_vec();
            into.dims.splice(0..0, leading);
            break;
        }
        dst -= 1;
        src -= 1;
        let src_size = shape.dims[src].size;
        let dst_size = into.dims[dst].size;
        if src_size == dst_size || src_size == 1 {
            continue;
        }
        if dst_size == 1 {
            into.dims[dst].size = src_size;
            continue;
        }
        return BroadcastMismatchSnafu { lhs: into.sizes(), rhs: shape.sizes() }.fail();
    }
    Ok(true)
}

/// Promoted output dtype over a set of input shapes.
///
/// Any float beats any non-float; within the same class the wider type
/// wins. The fold seed is `Invalid`, which loses to everything.
pub fn compute_output_type(shapes: &[TensorShape]) -> DataType {
    let mut ret = DataType::Invalid;
    for shape in shapes {
        let cur = shape.dtype;
        if cur.is_float() != ret.is_float() {
            if cur.is_float() {
                ret = cur;
            }
        } else if cur.bit_width() > ret.bit_width() {
            ret = cur;
        }
    }
    ret
}

/// Default elementwise result shape: broadcast all inputs together and
/// promote their dtypes.
///
/// Integer constants contribute a scalar INT32 shape and float constants a
/// scalar FLOAT32 shape. Strides are recomputed row-major whenever any fold
/// actually broadcast.
pub fn compute_output_shape(inputs: &[Binding]) -> Result<TensorShape> {
    let mut ret = TensorShape::default();
    let mut did_broadcast = false;
    let mut shapes = Vec::with_capacity(inputs.len());
    for input in inputs {
        let shape = match input {
            Binding::Tensor(shape) => shape.clone(),
            Binding::IConst(_) => TensorShape::scalar(DataType::Int32),
            Binding::FConst { .. } => TensorShape::scalar(DataType::Float32),
            Binding::Tuple(_) => {
                return UnsupportedBindingSnafu { context: "elementwise broadcasting" }.fail();
            }
        };
        did_broadcast = merge_shapes(&mut ret, &shape)? || did_broadcast;
        shapes.push(shape);
    }
    if did_broadcast {
        let mut stride = 1i64;
        for dim in ret.dims.iter_mut().rev() {
            dim.stride = stride;
            stride *= dim.size as i64;
        }
    }
    ret.dtype = compute_output_type(&shapes);
    Ok(ret)
}

/// Infer a binding for every node of an already linearized sequence.
///
/// The result maps node ids to bindings; nodes shared along several paths
/// get exactly one entry.
pub fn evaluate_bindings(flat: &[ExprRef]) -> Result<HashMap<u64, Binding>> {
    let mut bindings: HashMap<u64, Binding> = HashMap::with_capacity(flat.len());
    for expr in flat {
        let binding = match expr.kind() {
            ExprKind::Param(param) => Binding::Tensor(param.shape.clone()),
            ExprKind::IntConst(value) => Binding::IConst(*value),
            ExprKind::FloatConst(value) => {
                Binding::FConst { value: *value, dtype: DataType::Float32 }
            }
            ExprKind::Call(call) => {
                let mut args = Vec::with_capacity(call.args.len());
                for arg in &call.args {
                    let arg_binding = bindings
                        .get(&arg.id())
                        .ok_or_else(|| MissingBindingSnafu { id: arg.id() }.build())?;
                    args.push(arg_binding.clone());
                }
                let shape = match SpecialOpRegistry::global().resolve(&call.fn_name) {
                    Some(op) => op.compute_shape(&args)?,
                    None => compute_output_shape(&args)?,
                };
                Binding::Tensor(shape)
            }
            ExprKind::Contraction(cion) => {
                let dtype = if cion.combo_op == CombinationOp::Cond {
                    DataType::Boolean
                } else {
                    let mut shapes = Vec::with_capacity(cion.inputs.len());
                    for input in &cion.inputs {
                        let spec =
                            input.as_tensor_spec().ok_or_else(|| MalformedContractionSnafu.build())?;
                        let binding = bindings
                            .get(&spec.source.id())
                            .ok_or_else(|| MissingBindingSnafu { id: spec.source.id() }.build())?;
                        let Binding::Tensor(shape) = binding else {
                            return ContractionInputSnafu.fail();
                        };
                        shapes.push(shape.clone());
                    }
                    compute_output_type(&shapes)
                };
                let output =
                    cion.output.as_tensor_spec().ok_or_else(|| MalformedContractionSnafu.build())?;
                Binding::Tensor(simple_shape(dtype, &output.output_sizes))
            }
            ExprKind::TensorSpec(_) => return UnexpectedTensorSpecSnafu.fail(),
        };
        bindings.insert(expr.id(), binding);
    }
    Ok(bindings)
}

/// Infer the shape of a single expression.
///
/// Linearizes the subgraph below it and runs a throwaway inference pass;
/// non-tensor results (bare constants) report the default shape.
pub fn evaluate_shape(expr: &ExprRef) -> Result<TensorShape> {
    let flat = linearize(std::slice::from_ref(expr))?;
    let bindings = evaluate_bindings(&flat)?;
    let binding =
        bindings.get(&expr.id()).ok_or_else(|| MissingBindingSnafu { id: expr.id() }.build())?;
    Ok(binding.shape_or_default())
}
