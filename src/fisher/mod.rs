//! Fisher information: per-detector matrices and their inversion into
//! parameter covariances.

pub mod inverse;
pub mod matrix;

pub use inverse::{SingularFisherMatrix, invert_fisher};
pub use matrix::fisher_matrix;
