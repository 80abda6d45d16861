use crate::binding::Binding;
use crate::registry::*;
use crate::shape::{TensorShape, simple_shape};

use tessel_dtype::DataType;
use test_case::test_case;

fn rule(name: &str) -> &'static dyn SpecialOp {
    SpecialOpRegistry::global().resolve(name).unwrap()
}

fn tensor(dtype: DataType, sizes: &[usize]) -> Binding {
    Binding::Tensor(simple_shape(dtype, sizes))
}

#[test]
fn test_unknown_names_are_not_registered() {
    assert!(SpecialOpRegistry::global().resolve("add").is_none());
    assert!(SpecialOpRegistry::global().resolve("bit_and").is_none());
}

#[test]
fn test_reshape() {
    let shape = rule("reshape")
        .compute_shape(&[tensor(DataType::Float32, &[6, 4]), Binding::IConst(24)])
        .unwrap();
    assert_eq!(shape, simple_shape(DataType::Float32, &[24]));
}

#[test]
fn test_reshape_rejects_non_integer_sizes() {
    let err = rule("reshape")
        .compute_shape(&[
            tensor(DataType::Float32, &[6, 4]),
            Binding::IConst(24),
            Binding::FConst { value: 1.0, dtype: DataType::Float32 },
        ])
        .unwrap_err();
    assert!(err.to_string().contains("must be integers"));
}

#[test]
fn test_reshape_requires_arguments() {
    assert!(rule("reshape").compute_shape(&[]).is_err());
}

#[test_case("as_float", 16, DataType::Float16)]
#[test_case("as_float", 32, DataType::Float32)]
#[test_case("as_float", 64, DataType::Float64)]
#[test_case("as_int", 16, DataType::Int16)]
#[test_case("as_int", 32, DataType::Int32)]
#[test_case("as_int", 64, DataType::Int64)]
#[test_case("as_uint", 16, DataType::UInt16)]
#[test_case("as_uint", 32, DataType::UInt32)]
#[test_case("as_uint", 64, DataType::UInt64)]
fn test_casts(fn_name: &str, width: i64, expected: DataType) {
    let shape = rule(fn_name)
        .compute_shape(&[tensor(DataType::Int32, &[5, 2]), Binding::IConst(width)])
        .unwrap();
    assert_eq!(shape.dtype, expected);
    assert_eq!(shape.sizes(), vec![5, 2]);
}

#[test]
fn test_cast_rejects_odd_width() {
    assert!(rule("as_float")
        .compute_shape(&[tensor(DataType::Int32, &[5]), Binding::IConst(8)])
        .is_err());
}

#[test]
fn test_comparison_broadcasts_and_returns_boolean() {
    let shape = rule("cmp_eq")
        .compute_shape(&[tensor(DataType::Int64, &[4, 1]), tensor(DataType::Float32, &[4, 3])])
        .unwrap();
    assert_eq!(shape.dtype, DataType::Boolean);
    assert_eq!(shape.sizes(), vec![4, 3]);
}

#[test]
fn test_index() {
    let shape = rule("index")
        .compute_shape(&[tensor(DataType::Float32, &[4, 3]), Binding::IConst(0)])
        .unwrap();
    assert_eq!(shape, simple_shape(DataType::Int32, &[4, 3]));
}

#[test]
fn test_element() {
    let tuple = Binding::Tuple(vec![
        tensor(DataType::Float32, &[2]),
        tensor(DataType::Int32, &[7, 7]),
    ]);
    let shape = rule("element").compute_shape(&[tuple.clone(), Binding::IConst(1)]).unwrap();
    assert_eq!(shape, simple_shape(DataType::Int32, &[7, 7]));

    assert!(rule("element").compute_shape(&[tuple, Binding::IConst(2)]).is_err());
}

#[test]
fn test_gather() {
    let shape = rule("gather")
        .compute_shape(&[tensor(DataType::Float32, &[9, 8, 7]), tensor(DataType::Int32, &[3, 2])])
        .unwrap();
    assert_eq!(shape, simple_shape(DataType::Float32, &[3, 2, 8, 7]));
}

#[test]
fn test_gather_requires_int32_indices() {
    assert!(rule("gather")
        .compute_shape(&[tensor(DataType::Float32, &[9]), tensor(DataType::Int64, &[3])])
        .is_err());
}

#[test]
fn test_gather_requires_non_scalar_data() {
    assert!(rule("gather")
        .compute_shape(&[tensor(DataType::Float32, &[]), tensor(DataType::Int32, &[3])])
        .is_err());
}

#[test]
fn test_scatter() {
    let shape = rule("scatter")
        .compute_shape(&[
            tensor(DataType::Float32, &[9, 8, 7]),
            tensor(DataType::Int32, &[5]),
            tensor(DataType::Float32, &[5, 8, 7]),
        ])
        .unwrap();
    assert_eq!(shape, simple_shape(DataType::Float32, &[5, 8, 7]));
}

#[test]
fn test_shape() {
    let shape =
        rule("shape").compute_shape(&[tensor(DataType::Float64, &[9, 8, 7])]).unwrap();
    assert_eq!(shape, simple_shape(DataType::Int32, &[3]));
}

#[test]
fn test_prng_step_state_value() {
    let state = rule("prng_step")
        .compute_shape(&[
            tensor(DataType::UInt32, &[3, K_RNG_SIZE]),
            Binding::IConst(2),
            Binding::IConst(3),
        ])
        .unwrap();
    assert_eq!(state, simple_shape(DataType::Prng, &[2, 3]));

    let next = rule("prng_state").compute_shape(&[Binding::Tensor(state.clone())]).unwrap();
    assert_eq!(next, simple_shape(DataType::UInt32, &[3, K_RNG_SIZE]));

    let value = rule("prng_value").compute_shape(&[Binding::Tensor(state)]).unwrap();
    assert_eq!(value, TensorShape::new(DataType::Float32, simple_shape(DataType::Prng, &[2, 3]).dims));
}

#[test]
fn test_prng_step_rejects_bad_state() {
    assert!(rule("prng_step")
        .compute_shape(&[tensor(DataType::UInt32, &[2, K_RNG_SIZE])])
        .is_err());
}

#[test]
fn test_prng_state_requires_prng_input() {
    assert!(rule("prng_state")
        .compute_shape(&[tensor(DataType::Float32, &[2, 3])])
        .is_err());
}
