use crate::*;

use tessel_dtype::DataType;
use tessel_ir::expr::{AggregationOp, CombinationOp, ExprKind};
use tessel_ir::shape::simple_shape;

fn input(name: &str, sizes: &[usize]) -> Tensor {
    Tensor::new(simple_shape(DataType::Float32, sizes), name)
}

fn matmul() -> Tensor {
    let a = input("A", &[8, 16]);
    let b = input("B", &[16, 32]);
    let c = Tensor::param("C");
    let m = Index::new();
    let n = Index::new();
    let k = Index::new();

    let mut acc = c.index_out(&[m.clone(), n.clone()], &[8, 32]).unwrap();
    acc += a.index(&[m, k.clone()]).unwrap() * b.index(&[k, n]).unwrap();
    c
}

#[test]
fn test_matmul_forms_contraction() {
    let c = matmul();
    assert!(c.is_contraction());

    let expr = c.expr();
    let cion = expr.as_contraction().unwrap();
    assert_eq!(cion.agg_op, AggregationOp::Sum);
    assert_eq!(cion.combo_op, CombinationOp::Multiply);
    assert_eq!(cion.inputs.len(), 2);
    assert!(cion.constraints.is_empty());
    // The destination parameter's name carries over.
    assert_eq!(cion.name.borrow().as_deref(), Some("C"));

    assert_eq!(c.shape().unwrap(), simple_shape(DataType::Float32, &[8, 32]));
}

#[test]
fn test_single_input_contraction_has_no_combo() {
    let a = input("A", &[4, 3]);
    let s = Tensor::param("S");
    let i = Index::new();
    let j = Index::new();

    // Row sums: S[i] += A[i, j].
    let mut acc = s.index_out(std::slice::from_ref(&i), &[4]).unwrap();
    acc += a.index(&[i, j]).unwrap();

    let expr = s.expr();
    let cion = expr.as_contraction().unwrap();
    assert_eq!(cion.combo_op, CombinationOp::None);
    assert_eq!(cion.inputs.len(), 1);
}

#[test]
fn test_aggregation_methods() {
    let a = input("A", &[4]);
    let i = Index::new();

    let max = Tensor::param("M");
    max.index_out(std::slice::from_ref(&i), &[4])
        .unwrap()
        .maximize(&a.index(std::slice::from_ref(&i)).unwrap())
        .unwrap();
    assert_eq!(max.expr().as_contraction().unwrap().agg_op, AggregationOp::Max);

    let min = Tensor::param("N");
    min.index_out(std::slice::from_ref(&i), &[4])
        .unwrap()
        .minimize(&a.index(std::slice::from_ref(&i)).unwrap())
        .unwrap();
    assert_eq!(min.expr().as_contraction().unwrap().agg_op, AggregationOp::Min);

    let copy = Tensor::param("P");
    copy.index_out(std::slice::from_ref(&i), &[4])
        .unwrap()
        .assign(&a.index(std::slice::from_ref(&i)).unwrap())
        .unwrap();
    assert_eq!(copy.expr().as_contraction().unwrap().agg_op, AggregationOp::Assign);

    let prod = Tensor::param("Q");
    let mut acc = prod.index_out(std::slice::from_ref(&i), &[4]).unwrap();
    acc *= a.index(std::slice::from_ref(&i)).unwrap();
    assert_eq!(prod.expr().as_contraction().unwrap().agg_op, AggregationOp::Prod);
}

#[test]
fn test_eq_and_cond_combinations() {
    let a = input("A", &[4]);
    let b = input("B", &[4]);
    let t = input("T", &[4]);
    let i = Index::new();

    let matches = Tensor::param("E");
    matches
        .index_out(std::slice::from_ref(&i), &[4])
        .unwrap()
        .assign(
            &a.index(std::slice::from_ref(&i))
                .unwrap()
                .eq(&b.index(std::slice::from_ref(&i)).unwrap()),
        )
        .unwrap();
    assert_eq!(matches.expr().as_contraction().unwrap().combo_op, CombinationOp::Eq);

    let selected = Tensor::param("W");
    let mut acc = selected.index_out(std::slice::from_ref(&i), &[4]).unwrap();
    acc += cond(
        &a.index(std::slice::from_ref(&i)).unwrap(),
        &b.index(std::slice::from_ref(&i)).unwrap(),
        &t.index(std::slice::from_ref(&i)).unwrap(),
    );
    let expr = selected.expr();
    let cion = expr.as_contraction().unwrap();
    assert_eq!(cion.combo_op, CombinationOp::Cond);
    assert_eq!(cion.inputs.len(), 3);
}

#[test]
fn test_cond_contraction_shape_is_boolean() {
    let a = input("A", &[4]);
    let b = input("B", &[4]);
    let t = input("T", &[4]);
    let i = Index::new();

    let out = Tensor::param("O");
    let mut acc = out.index_out(std::slice::from_ref(&i), &[4]).unwrap();
    acc += cond(
        &a.index(std::slice::from_ref(&i)).unwrap(),
        &b.index(std::slice::from_ref(&i)).unwrap(),
        &t.index(std::slice::from_ref(&i)).unwrap(),
    );
    assert_eq!(out.shape().unwrap().dtype, DataType::Boolean);
}

#[test]
fn test_constraints_are_harvested() {
    let a = input("A", &[10]);
    let out = Tensor::param("O");
    let i = Index::new();
    let k = Index::new();
    k.lt(5);

    let mut acc = out.index_out(std::slice::from_ref(&i), &[6]).unwrap();
    acc += a.index(&[&i + &k]).unwrap();

    let expr = out.expr();
    let cion = expr.as_contraction().unwrap();
    assert_eq!(cion.constraints.len(), 1);
    assert_eq!(cion.constraints[0].rhs, 5);
}

#[test]
fn test_constraint_shared_by_two_specs_collected_once() {
    let a = input("A", &[4]);
    let b = input("B", &[4]);
    let out = Tensor::param("O");
    let i = Index::new();
    let k = Index::new();
    k.lt(3);

    // k appears in both input specs; its constraint must surface once.
    let mut acc = out.index_out(std::slice::from_ref(&i), &[1]).unwrap();
    acc += a.index(std::slice::from_ref(&k)).unwrap()
        * b.index(std::slice::from_ref(&k)).unwrap();

    let expr = out.expr();
    assert_eq!(expr.as_contraction().unwrap().constraints.len(), 1);
}

#[test]
fn test_constraints_only_from_referenced_indexes() {
    let a = input("A", &[10]);
    let out = Tensor::param("O");
    let i = Index::new();
    let unrelated = Index::new();
    unrelated.lt(7);

    let mut acc = out.index_out(std::slice::from_ref(&i), &[10]).unwrap();
    acc += a.index(std::slice::from_ref(&i)).unwrap();

    let expr = out.expr();
    assert!(expr.as_contraction().unwrap().constraints.is_empty());
}

#[test]
fn test_use_default_and_no_defract() {
    let c = matmul();
    let fallback = input("F", &[8, 32]);
    c.use_default(&fallback).unwrap().no_defract().unwrap();

    let expr = c.expr();
    let cion = expr.as_contraction().unwrap();
    assert!(cion.no_defract.get());
    assert!(cion.use_default.borrow().is_some());
}

#[test]
fn test_combined_access_cannot_be_destination() {
    let a = input("A", &[4]);
    let b = input("B", &[4]);
    let i = Index::new();

    let mut combined = a.index(std::slice::from_ref(&i)).unwrap()
        + b.index(std::slice::from_ref(&i)).unwrap();
    let rhs = a.index(std::slice::from_ref(&i)).unwrap();
    assert!(matches!(
        combined.aggregate(AggregationOp::Sum, &rhs),
        Err(Error::OutputNotSpec)
    ));
}

#[test]
fn test_nested_combination_is_rejected() {
    let a = input("A", &[4]);
    let b = input("B", &[4]);
    let c = input("C", &[4]);
    let out = Tensor::param("O");
    let i = Index::new();

    let nested = (a.index(std::slice::from_ref(&i)).unwrap()
        + b.index(std::slice::from_ref(&i)).unwrap())
        + c.index(std::slice::from_ref(&i)).unwrap();
    let mut acc = out.index_out(std::slice::from_ref(&i), &[4]).unwrap();
    assert!(matches!(
        acc.aggregate(AggregationOp::Sum, &nested),
        Err(Error::InputNotSpec)
    ));
}

#[test]
fn test_second_contraction_keeps_first_expression_alive() {
    let a = input("A", &[4]);
    let i = Index::new();

    let out = Tensor::param("O");
    let mut acc = out.index_out(std::slice::from_ref(&i), &[4]).unwrap();
    acc.assign(&a.index(std::slice::from_ref(&i)).unwrap()).unwrap();
    let first = out.expr();

    // Rebinding through a fresh access replaces the handle, not the node.
    let mut acc = out.index_out(std::slice::from_ref(&i), &[4]).unwrap();
    acc.assign(&a.index(std::slice::from_ref(&i)).unwrap()).unwrap();
    let second = out.expr();

    assert_ne!(first.id(), second.id());
    assert!(matches!(first.kind(), ExprKind::Contraction(_)));
}
