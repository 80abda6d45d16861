use snafu::Snafu;
use tessel_ir::affine::PolyOpKind;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("graph analysis failed"))]
    Ir { source: tessel_ir::Error },

    /// An index polynomial multiplies two non-constant operands.
    #[snafu(display("Non-linear polynomial"))]
    NonLinearPolynomial,

    #[snafu(display("divisor of polynomials must be a constant"))]
    NonConstantDivisor,

    #[snafu(display("division by zero in index polynomial"))]
    DivisionByZero,

    #[snafu(display("invalid number of operands for {op:?}: got {actual}"))]
    PolyOperandCount { op: PolyOpKind, actual: usize },

    /// Internal: a node was referenced before being emitted.
    #[snafu(display("no name assigned to expression {id}"))]
    MissingName { id: u64 },

    /// Internal: a contraction whose output or inputs are not access specs.
    #[snafu(display("contraction output and inputs must be tensor access specs"))]
    MalformedContraction,

    /// Internal: a tensor access spec reached emission directly.
    #[snafu(display("tensor access specs cannot be emitted as operations"))]
    UnexpectedTensorSpec,
}
