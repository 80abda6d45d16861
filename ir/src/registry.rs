//! Registry of functions whose output shape is not derivable by
//! broadcasting.
//!
//! The registry is a process-wide table built once at first use and
//! read-only from then on. Inference consults it before falling back to the
//! default elementwise rule.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use tessel_dtype::DataType;

use crate::binding::Binding;
use crate::error::{
    IndexTensorTypeSnafu, InvalidPrngStateSnafu, InvalidWidthSnafu, NegativeDimensionSnafu,
    NotATensorSnafu, NotATupleSnafu, NotAnIntegerSnafu, NotPrngSnafu, Result, ScalarArgumentSnafu,
    SpecialOpAritySnafu, TupleIndexOutOfBoundsSnafu,
};
use crate::infer::compute_output_shape;
use crate::shape::{TensorShape, simple_shape};

/// Number of columns in a PRNG state tensor; shared with the downstream
/// runtime.
pub const K_RNG_SIZE: usize = 2048;

/// A shape-inference rule overriding default broadcasting.
pub trait SpecialOp: Send + Sync {
    fn compute_shape(&self, args: &[Binding]) -> Result<TensorShape>;
}

pub struct SpecialOpRegistry {
    entries: HashMap<&'static str, Box<dyn SpecialOp>>,
}

impl SpecialOpRegistry {
    fn register(&mut self, name: &'static str, op: Box<dyn SpecialOp>) {
        self.entries.insert(name, op);
    }

    pub fn resolve(&self, name: &str) -> Option<&dyn SpecialOp> {
        self.entries.get(name).map(Box::as_ref)
    }

    /// The process-wide registry, populated on first access.
    pub fn global() -> &'static SpecialOpRegistry {
        static REGISTRY: Lazy<SpecialOpRegistry> = Lazy::new(|| {
            let mut registry = SpecialOpRegistry { entries: HashMap::new() };
            registry.register("as_float", Box::new(CastOp { fn_name: "as_float", class: CastClass::Float }));
            registry.register("as_int", Box::new(CastOp { fn_name: "as_int", class: CastClass::Int }));
            registry.register("as_uint", Box::new(CastOp { fn_name: "as_uint", class: CastClass::Uint }));
            registry.register("cmp_eq", Box::new(BooleanOp));
            registry.register("cmp_ge", Box::new(BooleanOp));
            registry.register("cmp_gt", Box::new(BooleanOp));
            registry.register("cmp_le", Box::new(BooleanOp));
            registry.register("cmp_lt", Box::new(BooleanOp));
            registry.register("cmp_ne", Box::new(BooleanOp));
            registry.register("element", Box::new(ElementOp));
            registry.register("gather", Box::new(GatherOp));
            registry.register("index", Box::new(IndexOp));
            registry.register("prng_state", Box::new(PrngStateOp));
            registry.register("prng_step", Box::new(PrngStepOp));
            registry.register("prng_value", Box::new(PrngValueOp));
            registry.register("reshape", Box::new(ReshapeOp));
            registry.register("scatter", Box::new(ScatterOp));
            registry.register("shape", Box::new(ShapeOp));
            registry
        });
        &REGISTRY
    }
}

fn expect_tensor<'a>(
    args: &'a [Binding],
    index: usize,
    fn_name: &'static str,
) -> Result<&'a TensorShape> {
    match &args[index] {
        Binding::Tensor(shape) => Ok(shape),
        _ => NotATensorSnafu { fn_name, index }.fail(),
    }
}

fn expect_iconst(args: &[Binding], index: usize, fn_name: &'static str) -> Result<i64> {
    args[index].as_iconst().ok_or_else(|| NotAnIntegerSnafu { fn_name }.build())
}

/// Trailing ICONST arguments as dimension sizes.
fn tail_sizes(args: &[Binding], fn_name: &'static str) -> Result<Vec<usize>> {
    let mut sizes = Vec::with_capacity(args.len() - 1);
    for index in 1..args.len() {
        let value = expect_iconst(args, index, fn_name)?;
        let size = usize::try_from(value).ok().ok_or_else(|| NegativeDimensionSnafu { value }.build())?;
        sizes.push(size);
    }
    Ok(sizes)
}

/// `reshape(t, s1, s2, …)`: same dtype, densely packed new sizes.
struct ReshapeOp;

impl SpecialOp for ReshapeOp {
    fn compute_shape(&self, args: &[Binding]) -> Result<TensorShape> {
        snafu::ensure!(
            !args.is_empty(),
            SpecialOpAritySnafu { fn_name: "reshape", expected: "at least 1", actual: args.len() }
        );
        let data = expect_tensor(args, 0, "reshape")?;
        let sizes = tail_sizes(args, "reshape")?;
        Ok(simple_shape(data.dtype, &sizes))
    }
}

/// Comparison result: broadcast like the default rule, then force BOOLEAN.
struct BooleanOp;

impl SpecialOp for BooleanOp {
    fn compute_shape(&self, args: &[Binding]) -> Result<TensorShape> {
        let mut ret = compute_output_shape(args)?;
        ret.dtype = DataType::Boolean;
        Ok(ret)
    }
}

enum CastClass {
    Float,
    Int,
    Uint,
}

/// `as_float`/`as_int`/`as_uint(t, width)`: same dims, re-typed element.
struct CastOp {
    fn_name: &'static str,
    class: CastClass,
}

impl SpecialOp for CastOp {
    fn compute_shape(&self, args: &[Binding]) -> Result<TensorShape> {
        snafu::ensure!(
            args.len() == 2,
            SpecialOpAritySnafu { fn_name: self.fn_name, expected: "exactly 2", actual: args.len() }
        );
        let data = expect_tensor(args, 0, self.fn_name)?;
        let width = expect_iconst(args, 1, self.fn_name)?;
        let dtype = match (&self.class, width) {
            (CastClass::Float, 16) => DataType::Float16,
            (CastClass::Float, 32) => DataType::Float32,
            (CastClass::Float, 64) => DataType::Float64,
            (CastClass::Int, 16) => DataType::Int16,
            (CastClass::Int, 32) => DataType::Int32,
            (CastClass::Int, 64) => DataType::Int64,
            (CastClass::Uint, 16) => DataType::UInt16,
            (CastClass::Uint, 32) => DataType::UInt32,
            (CastClass::Uint, 64) => DataType::UInt64,
            _ => return InvalidWidthSnafu { fn_name: self.fn_name, width }.fail(),
        };
        let mut ret = data.clone();
        ret.dtype = dtype;
        Ok(ret)
    }
}

/// `index(t, axis)`: per-element coordinates along an axis, INT32.
struct IndexOp;

impl SpecialOp for IndexOp {
    fn compute_shape(&self, args: &[Binding]) -> Result<TensorShape> {
        snafu::ensure!(
            args.len() == 2,
            SpecialOpAritySnafu { fn_name: "index", expected: "exactly 2", actual: args.len() }
        );
        let data = expect_tensor(args, 0, "index")?;
        expect_iconst(args, 1, "index")?;
        Ok(simple_shape(DataType::Int32, &data.sizes()))
    }
}

/// `element(tuple, i)`: shape of the selected tuple member.
struct ElementOp;

impl SpecialOp for ElementOp {
    fn compute_shape(&self, args: &[Binding]) -> Result<TensorShape> {
        snafu::ensure!(
            args.len() == 2,
            SpecialOpAritySnafu { fn_name: "element", expected: "exactly 2", actual: args.len() }
        );
        let Binding::Tuple(elements) = &args[0] else {
            return NotATupleSnafu { fn_name: "element" }.fail();
        };
        let index = expect_iconst(args, 1, "element")?;
        let element = usize::try_from(index)
            .ok()
            .and_then(|i| elements.get(i))
            .ok_or_else(|| TupleIndexOutOfBoundsSnafu { index, len: elements.len() }.build())?;
        match element {
            Binding::Tensor(shape) => Ok(shape.clone()),
            _ => NotATensorSnafu { fn_name: "element", index: 0usize }.fail(),
        }
    }
}

/// `gather(data, idx)`: idx dims followed by the trailing data dims.
struct GatherOp;

impl SpecialOp for GatherOp {
    fn compute_shape(&self, args: &[Binding]) -> Result<TensorShape> {
        snafu::ensure!(
            args.len() == 2,
            SpecialOpAritySnafu { fn_name: "gather", expected: "exactly 2", actual: args.len() }
        );
        let data = expect_tensor(args, 0, "gather")?;
        let index = expect_tensor(args, 1, "gather")?;
        snafu::ensure!(!data.dims.is_empty(), ScalarArgumentSnafu { fn_name: "gather", index: 0usize });
        snafu::ensure!(
            index.dtype == DataType::Int32,
            IndexTensorTypeSnafu { fn_name: "gather", actual: index.dtype }
        );
        let mut sizes = index.sizes();
        sizes.extend(data.sizes().iter().skip(1));
        Ok(simple_shape(data.dtype, &sizes))
    }
}

/// `scatter(data, idx, upd)`: leading update dim, then the data dims the
/// index does not cover.
struct ScatterOp;

impl SpecialOp for ScatterOp {
    fn compute_shape(&self, args: &[Binding]) -> Result<TensorShape> {
        snafu::ensure!(
            args.len() == 3,
            SpecialOpAritySnafu { fn_name: "scatter", expected: "exactly 3", actual: args.len() }
        );
        let data = expect_tensor(args, 0, "scatter")?;
        let index = expect_tensor(args, 1, "scatter")?;
        let update = expect_tensor(args, 2, "scatter")?;
        snafu::ensure!(!data.dims.is_empty(), ScalarArgumentSnafu { fn_name: "scatter", index: 0usize });
        snafu::ensure!(
            index.dtype == DataType::Int32,
            IndexTensorTypeSnafu { fn_name: "scatter", actual: index.dtype }
        );
        snafu::ensure!(!update.dims.is_empty(), ScalarArgumentSnafu { fn_name: "scatter", index: 2usize });
        let mut sizes = vec![update.dims[0].size];
        sizes.extend(data.sizes().iter().skip(index.rank()));
        Ok(simple_shape(data.dtype, &sizes))
    }
}

/// `shape(t)`: rank-length INT32 vector.
struct ShapeOp;

impl SpecialOp for ShapeOp {
    fn compute_shape(&self, args: &[Binding]) -> Result<TensorShape> {
        snafu::ensure!(
            args.len() == 1,
            SpecialOpAritySnafu { fn_name: "shape", expected: "exactly 1", actual: args.len() }
        );
        let data = expect_tensor(args, 0, "shape")?;
        Ok(simple_shape(DataType::Int32, &[data.rank()]))
    }
}

struct PrngStateOp;

impl SpecialOp for PrngStateOp {
    fn compute_shape(&self, args: &[Binding]) -> Result<TensorShape> {
        snafu::ensure!(
            args.len() == 1,
            SpecialOpAritySnafu { fn_name: "prng_state", expected: "exactly 1", actual: args.len() }
        );
        let data = expect_tensor(args, 0, "prng_state")?;
        snafu::ensure!(data.dtype == DataType::Prng, NotPrngSnafu { fn_name: "prng_state" });
        Ok(simple_shape(DataType::UInt32, &[3, K_RNG_SIZE]))
    }
}

struct PrngValueOp;

impl SpecialOp for PrngValueOp {
    fn compute_shape(&self, args: &[Binding]) -> Result<TensorShape> {
        snafu::ensure!(
            args.len() == 1,
            SpecialOpAritySnafu { fn_name: "prng_value", expected: "exactly 1", actual: args.len() }
        );
        let data = expect_tensor(args, 0, "prng_value")?;
        snafu::ensure!(data.dtype == DataType::Prng, NotPrngSnafu { fn_name: "prng_value" });
        Ok(TensorShape::new(DataType::Float32, data.dims.clone()))
    }
}

struct PrngStepOp;

impl SpecialOp for PrngStepOp {
    fn compute_shape(&self, args: &[Binding]) -> Result<TensorShape> {
        snafu::ensure!(
            !args.is_empty(),
            SpecialOpAritySnafu { fn_name: "prng_step", expected: "at least 1", actual: args.len() }
        );
        let state = expect_tensor(args, 0, "prng_step")?;
        snafu::ensure!(
            *state == simple_shape(DataType::UInt32, &[3, K_RNG_SIZE]),
            InvalidPrngStateSnafu
        );
        let sizes = tail_sizes(args, "prng_step")?;
        Ok(simple_shape(DataType::Prng, &sizes))
    }
}
