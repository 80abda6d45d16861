pub mod emit;
pub mod error;
pub mod poly_eval;
pub mod program;

#[cfg(test)]
pub mod test;

pub use emit::emit_program;
pub use error::{Error, Result};
pub use poly_eval::PolyEvaluator;
pub use program::{Contraction, Input, InputTag, Op, Program, RunInfo, TensorSpec};
