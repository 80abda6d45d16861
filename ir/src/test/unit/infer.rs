use std::cell::{Cell, RefCell};

use crate::affine::PolyExpr;
use crate::binding::Binding;
use crate::expr::*;
use crate::infer::*;
use crate::shape::{TensorShape, simple_shape};
use crate::traverse::linearize;

use tessel_dtype::DataType;

fn tensor(sizes: &[usize]) -> Binding {
    Binding::Tensor(simple_shape(DataType::Float32, sizes))
}

#[test]
fn test_merge_adopts_first_shape() {
    let mut into = TensorShape::default();
    let shape = simple_shape(DataType::Float32, &[4, 3]);
    assert!(!merge_shapes(&mut into, &shape).unwrap());
    assert_eq!(into.dims, shape.dims);
}

#[test]
fn test_merge_equal_shapes_do_not_broadcast() {
    let mut into = simple_shape(DataType::Float32, &[4, 3]);
    let shape = simple_shape(DataType::Float32, &[4, 3]);
    assert!(!merge_shapes(&mut into, &shape).unwrap());
}

#[test]
fn test_merge_broadcasts_ones_and_prepends() {
    let mut into = simple_shape(DataType::Float32, &[4, 1, 3]);
    let shape = simple_shape(DataType::Float32, &[2, 3]);
    assert!(merge_shapes(&mut into, &shape).unwrap());
    assert_eq!(into.sizes(), vec![4, 2, 3]);
}

#[test]
fn test_merge_scalar_is_neutral() {
    let mut into = simple_shape(DataType::Float32, &[4, 3]);
    assert!(!merge_shapes(&mut into, &TensorShape::scalar(DataType::Float32)).unwrap());
    assert_eq!(into.sizes(), vec![4, 3]);
}

#[test]
fn test_merge_incompatible_fails() {
    let mut into = simple_shape(DataType::Float32, &[2, 3]);
    let shape = simple_shape(DataType::Float32, &[2, 4]);
    assert!(merge_shapes(&mut into, &shape).is_err());
}

#[test]
fn test_output_shape_recomputes_strides() {
    let out = compute_output_shape(&[tensor(&[4, 1, 3]), tensor(&[2, 3])]).unwrap();
    assert_eq!(out.sizes(), vec![4, 2, 3]);
    let strides: Vec<i64> = out.dims.iter().map(|dim| dim.stride).collect();
    assert_eq!(strides, vec![6, 3, 1]);
    assert_eq!(out.dtype, DataType::Float32);
}

#[test]
fn test_output_shape_constants_are_scalars() {
    let out = compute_output_shape(&[
        Binding::IConst(1),
        Binding::FConst { value: 0.0, dtype: DataType::Float32 },
    ])
    .unwrap();
    assert_eq!(out.rank(), 0);
    assert_eq!(out.dtype, DataType::Float32);
}

#[test]
fn test_output_shape_rejects_tuples() {
    let result = compute_output_shape(&[Binding::Tuple(vec![Binding::IConst(0)])]);
    assert!(result.is_err());
}

#[test]
fn test_output_type_float_beats_wider_int() {
    let shapes =
        [simple_shape(DataType::Int64, &[2]), simple_shape(DataType::Float16, &[2])];
    assert_eq!(compute_output_type(&shapes), DataType::Float16);
}

#[test]
fn test_output_type_widest_within_class() {
    let shapes = [
        TensorShape::scalar(DataType::Int16),
        TensorShape::scalar(DataType::Int64),
        TensorShape::scalar(DataType::Int32),
    ];
    assert_eq!(compute_output_type(&shapes), DataType::Int64);

    let floats =
        [TensorShape::scalar(DataType::Float32), TensorShape::scalar(DataType::Float64)];
    assert_eq!(compute_output_type(&floats), DataType::Float64);
}

#[test]
fn test_bindings_for_leaves() {
    let a = ExprNode::param(simple_shape(DataType::Float32, &[4]), "A");
    let one = ExprNode::int_const(1);
    let pi = ExprNode::float_const(3.5);
    let flat = linearize(&[a.clone(), one.clone(), pi.clone()]).unwrap();
    let bindings = evaluate_bindings(&flat).unwrap();

    assert_eq!(bindings[&a.id()], Binding::Tensor(simple_shape(DataType::Float32, &[4])));
    assert_eq!(bindings[&one.id()], Binding::IConst(1));
    assert_eq!(bindings[&pi.id()], Binding::FConst { value: 3.5, dtype: DataType::Float32 });
}

#[test]
fn test_call_dispatches_to_registry() {
    let a = ExprNode::param(simple_shape(DataType::Float32, &[4]), "A");
    let b = ExprNode::param(simple_shape(DataType::Float32, &[4]), "B");
    let cmp = ExprNode::call("cmp_lt", vec![a, b]);
    let flat = linearize(std::slice::from_ref(&cmp)).unwrap();
    let bindings = evaluate_bindings(&flat).unwrap();

    let shape = bindings[&cmp.id()].shape().unwrap();
    assert_eq!(shape.dtype, DataType::Boolean);
    assert_eq!(shape.sizes(), vec![4]);
}

fn contraction(combo_op: CombinationOp, inputs: &[&ExprRef], output_sizes: &[usize]) -> ExprRef {
    let dest = ExprNode::param(TensorShape::default(), "O");
    let output_spec = ExprNode::tensor_spec(
        dest,
        output_sizes.iter().map(|_| PolyExpr::anonymous_index(crate::next_index_id())).collect(),
        output_sizes.to_vec(),
    );
    let input_specs = inputs
        .iter()
        .map(|source| {
            let rank = match source.kind() {
                ExprKind::Param(param) => param.shape.rank(),
                _ => 0,
            };
            ExprNode::tensor_spec(
                (*source).clone(),
                (0..rank).map(|_| PolyExpr::anonymous_index(crate::next_index_id())).collect(),
                Vec::new(),
            )
        })
        .collect();
    ExprNode::contraction(ContractionExpr {
        agg_op: AggregationOp::Sum,
        combo_op,
        output: output_spec,
        inputs: input_specs,
        constraints: Vec::new(),
        no_defract: Cell::new(false),
        use_default: RefCell::new(None),
        name: RefCell::new(None),
    })
}

#[test]
fn test_contraction_binding_promotes_inputs() {
    let a = ExprNode::param(simple_shape(DataType::Int32, &[4, 8]), "A");
    let b = ExprNode::param(simple_shape(DataType::Float32, &[8, 2]), "B");
    let cion = contraction(CombinationOp::Multiply, &[&a, &b], &[4, 2]);

    let flat = linearize(std::slice::from_ref(&cion)).unwrap();
    let bindings = evaluate_bindings(&flat).unwrap();
    let shape = bindings[&cion.id()].shape().unwrap();
    assert_eq!(*shape, simple_shape(DataType::Float32, &[4, 2]));
}

#[test]
fn test_cond_contraction_is_boolean() {
    let a = ExprNode::param(simple_shape(DataType::Float32, &[4]), "A");
    let cion = contraction(CombinationOp::Cond, &[&a], &[4]);

    let flat = linearize(std::slice::from_ref(&cion)).unwrap();
    let bindings = evaluate_bindings(&flat).unwrap();
    assert_eq!(bindings[&cion.id()].shape().unwrap().dtype, DataType::Boolean);
}

#[test]
fn test_evaluate_shape_of_constant_is_default() {
    let one = ExprNode::int_const(1);
    let shape = evaluate_shape(&one).unwrap();
    assert_eq!(shape, TensorShape::default());
}
