use snafu::Snafu;
use tessel_dtype::DataType;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Incompatible shapes in elementwise broadcasting.
    #[snafu(display("mismatched tensor shapes in elementwise operation: {lhs:?} cannot match {rhs:?}"))]
    BroadcastMismatch { lhs: Vec<usize>, rhs: Vec<usize> },

    /// A tuple binding reached a context that only accepts scalars/tensors.
    #[snafu(display("{context} cannot operate on a tuple binding"))]
    UnsupportedBinding { context: &'static str },

    /// Contraction inputs must have tensor bindings.
    #[snafu(display("contraction inputs must be tensors"))]
    ContractionInput,

    /// A tensor access spec escaped its contraction.
    #[snafu(display("tensor access specs cannot be evaluated as standalone expressions"))]
    UnexpectedTensorSpec,

    /// Internal: a contraction whose output or inputs are not access specs.
    #[snafu(display("contraction output and inputs must be tensor access specs"))]
    MalformedContraction,

    /// Internal: a node was visited before its operands.
    #[snafu(display("no binding recorded for expression {id}"))]
    MissingBinding { id: u64 },

    /// Special op called with the wrong number of arguments.
    #[snafu(display("'{fn_name}' requires {expected} argument(s), got {actual}"))]
    SpecialOpArity { fn_name: &'static str, expected: &'static str, actual: usize },

    /// Special op argument that must be a tensor is not.
    #[snafu(display("'{fn_name}' requires argument {index} to be a tensor"))]
    NotATensor { fn_name: &'static str, index: usize },

    /// Special op argument that must be an integer constant is not.
    #[snafu(display("additional parameters to '{fn_name}' must be integers"))]
    NotAnInteger { fn_name: &'static str },

    #[snafu(display("'{fn_name}' requires the first argument to be a tuple"))]
    NotATuple { fn_name: &'static str },

    #[snafu(display("'{fn_name}' requires the width to be one of: (16, 32, 64), got {width}"))]
    InvalidWidth { fn_name: &'static str, width: i64 },

    #[snafu(display("dimension sizes must be non-negative, got {value}"))]
    NegativeDimension { value: i64 },

    #[snafu(display("'element' index {index} is outside the bounds of a {len}-tuple"))]
    TupleIndexOutOfBounds { index: i64, len: usize },

    #[snafu(display("'{fn_name}' requires an INT32 index tensor, got {actual:?}"))]
    IndexTensorType { fn_name: &'static str, actual: DataType },

    #[snafu(display("'{fn_name}' requires argument {index} to have at least one dimension"))]
    ScalarArgument { fn_name: &'static str, index: usize },

    #[snafu(display("'{fn_name}' requires its argument to be the result of 'prng_step'"))]
    NotPrng { fn_name: &'static str },

    #[snafu(display("'prng_step' requires a valid PRNG state tensor"))]
    InvalidPrngState,
}
