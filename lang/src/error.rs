use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("shape inference failed"))]
    Ir { source: tessel_ir::Error },

    #[snafu(display("lowering failed"))]
    Lower { source: tessel_lower::Error },

    #[snafu(display(
        "dimensions and sizes mismatch in contraction output: indexes {indices}, sizes {sizes}"
    ))]
    OutputArityMismatch { indices: usize, sizes: usize },

    #[snafu(display(
        "unexpected number of dimensions in contraction input: expected {expected}, actual {actual}"
    ))]
    InputRankMismatch { expected: usize, actual: usize },

    #[snafu(display("requested dimension {dim} exceeds tensor rank {rank}"))]
    DimOutOfRange { dim: usize, rank: usize },

    #[snafu(display("{method} can only be specified on a contraction"))]
    NotAContraction { method: &'static str },

    #[snafu(display("contraction output must be a tensor access"))]
    OutputNotSpec,

    #[snafu(display("contraction right-hand side must be a tensor access or a combining call"))]
    InvalidContractionRhs,

    #[snafu(display(
        "contraction inputs must combine with add, mul, eq or cond; got '{fn_name}'"
    ))]
    InvalidCombination { fn_name: String },

    #[snafu(display("combined contraction inputs must be tensor accesses"))]
    InputNotSpec,
}
