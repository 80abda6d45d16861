pub mod contraction;
