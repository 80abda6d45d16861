//! The flat program handed to the downstream compiler.
//!
//! A program is a list of named inputs, an ordered op sequence in
//! dependency order, and the output names. Ops reference each other purely
//! by name; shape metadata travels in side tables on [`RunInfo`].

use std::collections::BTreeMap;
use std::fmt;

use tessel_ir::binding::Binding;
use tessel_ir::expr::{AggregationOp, CombinationOp};
use tessel_ir::poly::{Polynomial, RangeConstraint};
use tessel_ir::shape::TensorShape;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputTag {
    /// Dimensions bound at runtime.
    Variable,
    /// Dimensions fixed at lowering time; all front-end inputs are fixed.
    Fixed,
}

#[derive(Debug, Clone)]
pub struct Input {
    pub tag: InputTag,
    pub name: String,
    /// Per-dimension names, `{name}_0`, `{name}_1`, …
    pub dims: Vec<String>,
}

/// One access site of an emitted contraction: the operand name plus one
/// canonical polynomial per dimension.
#[derive(Debug, Clone)]
pub struct TensorSpec {
    pub id: String,
    pub spec: Vec<Polynomial>,
}

/// The full contraction record carried by a [`Op::Contraction`].
///
/// `specs[0]` is the output access; the rest line up with `inputs`.
#[derive(Debug, Clone)]
pub struct Contraction {
    pub agg_op: AggregationOp,
    pub comb_op: CombinationOp,
    pub no_defract: bool,
    pub use_default: Option<String>,
    pub specs: Vec<TensorSpec>,
    pub output_size: Vec<String>,
    pub constraints: Vec<RangeConstraint>,
}

#[derive(Debug, Clone)]
pub enum Op {
    /// A literal; `fn_name` is `iconst` or `fconst`.
    Constant { output: String, value: String, fn_name: &'static str },
    Function { output: String, fn_name: String, inputs: Vec<String> },
    Contraction { output: String, inputs: Vec<String>, cion: Contraction },
}

impl Op {
    pub fn output(&self) -> &str {
        match self {
            Op::Constant { output, .. }
            | Op::Function { output, .. }
            | Op::Contraction { output, .. } => output,
        }
    }

    /// Names of the operands this op reads; empty for constants.
    pub fn input_names(&self) -> &[String] {
        match self {
            Op::Constant { .. } => &[],
            Op::Function { inputs, .. } | Op::Contraction { inputs, .. } => inputs,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Program {
    pub inputs: Vec<Input>,
    pub ops: Vec<Op>,
    pub outputs: Vec<String>,
    /// Counter behind the `_X<k>` names; handed to the consumer so it can
    /// keep minting non-clashing temporaries.
    pub next_tmp: usize,
}

fn comb_separator(comb_op: CombinationOp) -> &'static str {
    match comb_op {
        CombinationOp::None => ", ",
        CombinationOp::Plus => " + ",
        CombinationOp::Multiply => " * ",
        CombinationOp::Eq => " == ",
        CombinationOp::Cond => " ? ",
    }
}

fn write_spec(f: &mut fmt::Formatter<'_>, spec: &TensorSpec) -> fmt::Result {
    write!(f, "{}[", spec.id)?;
    for (i, poly) in spec.spec.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{poly}")?;
    }
    write!(f, "]")
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "function (")?;
        for (i, input) in self.inputs.iter().enumerate() {
            let sep = if i + 1 < self.inputs.len() { "," } else { "" };
            writeln!(f, "  {}[{}]{}", input.name, input.dims.join(", "), sep)?;
        }
        writeln!(f, ") -> (")?;
        for (i, output) in self.outputs.iter().enumerate() {
            let sep = if i + 1 < self.outputs.len() { "," } else { "" };
            writeln!(f, "  {output}{sep}")?;
        }
        writeln!(f, ") {{")?;
        for op in &self.ops {
            match op {
                Op::Constant { output, value, fn_name } => {
                    writeln!(f, "  {output} = {fn_name}({value});")?;
                }
                Op::Function { output, fn_name, inputs } => {
                    writeln!(f, "  {output} = {fn_name}({});", inputs.join(", "))?;
                }
                Op::Contraction { cion, .. } => {
                    let output = &cion.specs[0];
                    write!(f, "  {}[", output.id)?;
                    for (i, poly) in output.spec.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{poly}")?;
                    }
                    write!(f, " : {}] = {}(", cion.output_size.join(", "), cion.agg_op.symbol())?;
                    for (i, spec) in cion.specs[1..].iter().enumerate() {
                        if i > 0 {
                            write!(f, "{}", comb_separator(cion.comb_op))?;
                        }
                        write_spec(f, spec)?;
                    }
                    write!(f, ")")?;
                    for constraint in &cion.constraints {
                        write!(f, ", {constraint}")?;
                    }
                    if let Some(name) = &cion.use_default {
                        write!(f, " default {name}")?;
                    }
                    if cion.no_defract {
                        write!(f, " no_defract")?;
                    }
                    writeln!(f, ";")?;
                }
            }
        }
        write!(f, "}}")
    }
}

/// Everything the downstream compiler needs: the program plus name-keyed
/// shape and binding tables.
#[derive(Debug, Clone)]
pub struct RunInfo {
    pub program_name: String,
    /// Textual rendering of the program, for logs.
    pub code: String,
    pub program: Program,
    pub input_shapes: BTreeMap<String, TensorShape>,
    pub output_shapes: BTreeMap<String, TensorShape>,
    /// Binding of every named node in the program.
    pub vars: BTreeMap<String, Binding>,
}
