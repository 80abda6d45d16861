//! Call-building operation methods on [`Tensor`].

use tessel_ir::expr::ExprNode;

use crate::Tensor;

macro_rules! impl_comparison_methods {
    ($($method:ident => $fn_name:literal),* $(,)?) => {
        impl Tensor {
            $(
                #[doc = concat!("Elementwise `", $fn_name, "`; the result is BOOLEAN.")]
                pub fn $method(&self, rhs: &Tensor) -> Tensor {
                    self.binary_call($fn_name, rhs)
                }
            )*
        }
    };
}

impl Tensor {
    pub(crate) fn unary_call(&self, fn_name: &str) -> Tensor {
        Tensor::from_expr(ExprNode::call(fn_name, vec![self.expr()]))
    }

    pub(crate) fn binary_call(&self, fn_name: &str, rhs: &Tensor) -> Tensor {
        Tensor::from_expr(ExprNode::call(fn_name, vec![self.expr(), rhs.expr()]))
    }
}

// Comparisons build `cmp_*` calls; the registered inference rule forces
// their output dtype to BOOLEAN. These are tensor-level operations, not the
// access-level `eq` combination inside contractions.
impl_comparison_methods! {
    eq => "cmp_eq",
    ne => "cmp_ne",
    lt => "cmp_lt",
    le => "cmp_le",
    gt => "cmp_gt",
    ge => "cmp_ge",
}
