//! Operator overloading for [`Tensor`].
//!
//! Building a call node never fails (all checking happens at inference
//! time), so the operators construct directly.

use crate::Tensor;

/// Implements a binary operator in all four ownership combinations.
macro_rules! impl_binary_op {
    ($trait:ident, $method:ident, $fn_name:literal) => {
        impl std::ops::$trait for &Tensor {
            type Output = Tensor;

            fn $method(self, rhs: &Tensor) -> Tensor {
                self.binary_call($fn_name, rhs)
            }
        }

        impl std::ops::$trait for Tensor {
            type Output = Tensor;

            fn $method(self, rhs: Tensor) -> Tensor {
                (&self).$method(&rhs)
            }
        }

        impl std::ops::$trait<Tensor> for &Tensor {
            type Output = Tensor;

            fn $method(self, rhs: Tensor) -> Tensor {
                self.$method(&rhs)
            }
        }

        impl std::ops::$trait<&Tensor> for Tensor {
            type Output = Tensor;

            fn $method(self, rhs: &Tensor) -> Tensor {
                (&self).$method(rhs)
            }
        }
    };
}

impl_binary_op!(Add, add, "add");
impl_binary_op!(Sub, sub, "sub");
impl_binary_op!(Mul, mul, "mul");
impl_binary_op!(Div, div, "div");
impl_binary_op!(Shl, shl, "bit_left");
impl_binary_op!(Shr, shr, "bit_right");
impl_binary_op!(BitAnd, bitand, "bit_and");
impl_binary_op!(BitOr, bitor, "bit_or");
impl_binary_op!(BitXor, bitxor, "bit_xor");

impl std::ops::Neg for &Tensor {
    type Output = Tensor;

    fn neg(self) -> Tensor {
        self.unary_call("neg")
    }
}

impl std::ops::Neg for Tensor {
    type Output = Tensor;

    fn neg(self) -> Tensor {
        -&self
    }
}

impl std::ops::Not for &Tensor {
    type Output = Tensor;

    fn not(self) -> Tensor {
        self.unary_call("bit_not")
    }
}

impl std::ops::Not for Tensor {
    type Output = Tensor;

    fn not(self) -> Tensor {
        !&self
    }
}
