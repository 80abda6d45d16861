//! Program emission.
//!
//! Walks the linearized, shape-annotated graph and emits one named input or
//! op per node. Node identity guarantees a shared subexpression is emitted
//! once and referenced by name everywhere else.

use std::collections::{BTreeMap, HashMap, HashSet};

use snafu::ResultExt;

use tessel_ir::binding::Binding;
use tessel_ir::error::MissingBindingSnafu;
use tessel_ir::expr::{ExprKind, ExprRef};
use tessel_ir::infer::evaluate_bindings;
use tessel_ir::poly::RangeConstraint;
use tessel_ir::shape::TensorShape;
use tessel_ir::traverse::linearize;

use crate::error::{
    IrSnafu, MalformedContractionSnafu, MissingNameSnafu, Result, UnexpectedTensorSpecSnafu,
};
use crate::poly_eval::PolyEvaluator;
use crate::program::{Contraction, Input, InputTag, Op, Program, RunInfo, TensorSpec};

/// Lower the graphs reachable from `roots` into a named program.
pub fn emit_program(name: impl Into<String>, roots: &[ExprRef]) -> Result<RunInfo> {
    ProgramEmitter::new(name.into()).emit(roots)
}

struct ProgramEmitter {
    program_name: String,
    /// User-derived names handed out so far; `_X<k>` temporaries live in a
    /// disjoint namespace (user names cannot start with `_`) and are not
    /// tracked here.
    names: HashSet<String>,
    names_by_expr: HashMap<u64, String>,
    bindings: HashMap<u64, Binding>,
    program: Program,
    input_shapes: BTreeMap<String, TensorShape>,
}

impl ProgramEmitter {
    fn new(program_name: String) -> Self {
        Self {
            program_name,
            names: HashSet::new(),
            names_by_expr: HashMap::new(),
            bindings: HashMap::new(),
            program: Program::default(),
            input_shapes: BTreeMap::new(),
        }
    }

    fn emit(mut self, roots: &[ExprRef]) -> Result<RunInfo> {
        let flat = linearize(roots).context(IrSnafu)?;
        self.bindings = evaluate_bindings(&flat).context(IrSnafu)?;
        for expr in &flat {
            self.emit_node(expr)?;
        }

        let mut output_shapes = BTreeMap::new();
        for root in roots {
            let name = self.name_of(root)?;
            let shape = self
                .bindings
                .get(&root.id())
                .ok_or_else(|| MissingBindingSnafu { id: root.id() }.build())
                .context(IrSnafu)?
                .shape_or_default();
            tracing::debug!(output = %name, shape = %shape, "program output");
            output_shapes.insert(name.clone(), shape);
            self.program.outputs.push(name);
        }

        let mut vars = BTreeMap::new();
        for (id, name) in &self.names_by_expr {
            let binding = self
                .bindings
                .get(id)
                .ok_or_else(|| MissingBindingSnafu { id: *id }.build())
                .context(IrSnafu)?;
            vars.insert(name.clone(), binding.clone());
        }

        let code = self.program.to_string();
        tracing::debug!(program = %code, "emitted program");
        Ok(RunInfo {
            program_name: self.program_name,
            code,
            program: self.program,
            input_shapes: self.input_shapes,
            output_shapes,
            vars,
        })
    }

    fn emit_node(&mut self, expr: &ExprRef) -> Result<()> {
        match expr.kind() {
            ExprKind::Param(param) => {
                let name = self.new_tmp(expr);
                let dims =
                    (0..param.shape.rank()).map(|i| format!("{name}_{i}")).collect();
                self.program.inputs.push(Input { tag: InputTag::Fixed, name: name.clone(), dims });
                self.input_shapes.insert(name.clone(), param.shape.clone());
                self.names_by_expr.insert(expr.id(), name);
            }
            ExprKind::IntConst(value) => {
                let name = self.new_tmp(expr);
                self.program.ops.push(Op::Constant {
                    output: name.clone(),
                    value: value.to_string(),
                    fn_name: "iconst",
                });
                self.names_by_expr.insert(expr.id(), name);
            }
            ExprKind::FloatConst(value) => {
                let name = self.new_tmp(expr);
                self.program.ops.push(Op::Constant {
                    output: name.clone(),
                    value: value.to_string(),
                    fn_name: "fconst",
                });
                self.names_by_expr.insert(expr.id(), name);
            }
            ExprKind::Call(call) => {
                let mut inputs = Vec::with_capacity(call.args.len());
                for arg in &call.args {
                    inputs.push(self.name_of(arg)?);
                }
                let name = self.new_tmp(expr);
                self.program.ops.push(Op::Function {
                    output: name.clone(),
                    fn_name: call.fn_name.clone(),
                    inputs,
                });
                self.names_by_expr.insert(expr.id(), name);
            }
            ExprKind::Contraction(cion_expr) => {
                // One evaluator spans all specs and constraints of this
                // contraction; input specs are folded first, so fresh names
                // mint in input order and the output spec reuses them.
                let mut poly_eval = PolyEvaluator::new();
                let mut specs = vec![TensorSpec { id: String::new(), spec: Vec::new() }];
                let mut inputs = Vec::with_capacity(cion_expr.inputs.len());
                for input in &cion_expr.inputs {
                    let spec_expr =
                        input.as_tensor_spec().ok_or_else(|| MalformedContractionSnafu.build())?;
                    let id = self.name_of(&spec_expr.source)?;
                    inputs.push(id.clone());
                    let mut polys = Vec::with_capacity(spec_expr.index_spec.len());
                    for idx in &spec_expr.index_spec {
                        polys.push(poly_eval.evaluate(idx)?);
                    }
                    specs.push(TensorSpec { id, spec: polys });
                }

                let name = self.new_tmp(expr);
                specs[0].id = name.clone();
                let output_spec = cion_expr
                    .output
                    .as_tensor_spec()
                    .ok_or_else(|| MalformedContractionSnafu.build())?;
                for idx in &output_spec.index_spec {
                    specs[0].spec.push(poly_eval.evaluate(idx)?);
                }
                let output_size =
                    output_spec.output_sizes.iter().map(ToString::to_string).collect();

                let mut constraints = Vec::with_capacity(cion_expr.constraints.len());
                for constraint in &cion_expr.constraints {
                    let poly = poly_eval.evaluate(&constraint.lhs)?;
                    constraints.push(RangeConstraint::new(poly, constraint.rhs as i64));
                }

                let use_default = match &*cion_expr.use_default.borrow() {
                    Some(fallback) => Some(self.name_of(fallback)?),
                    None => None,
                };

                self.program.ops.push(Op::Contraction {
                    output: name.clone(),
                    inputs,
                    cion: Contraction {
                        agg_op: cion_expr.agg_op,
                        comb_op: cion_expr.combo_op,
                        no_defract: cion_expr.no_defract.get(),
                        use_default,
                        specs,
                        output_size,
                        constraints,
                    },
                });
                self.names_by_expr.insert(expr.id(), name);
            }
            ExprKind::TensorSpec(_) => return UnexpectedTensorSpecSnafu.fail(),
        }
        Ok(())
    }

    fn name_of(&self, expr: &ExprRef) -> Result<String> {
        self.names_by_expr
            .get(&expr.id())
            .cloned()
            .ok_or_else(|| MissingNameSnafu { id: expr.id() }.build())
    }

    /// Assign this node its program name: the user name made unique, or a
    /// fresh `_X<k>` temporary.
    fn new_tmp(&mut self, expr: &ExprRef) -> String {
        match expr.user_name() {
            Some(prefix) => self.make_unique_name(prefix),
            None => {
                let name = format!("_X{}", self.program.next_tmp);
                self.program.next_tmp += 1;
                name
            }
        }
    }

    fn make_unique_name(&mut self, prefix: String) -> String {
        if self.names.insert(prefix.clone()) {
            return prefix;
        }
        for i in 0.. {
            let candidate = format!("{prefix}{i}");
            if self.names.insert(candidate.clone()) {
                return candidate;
            }
        }
        unreachable!("name space exhausted")
    }
}
