pub mod env;
pub mod error;
pub mod numeric;
pub mod tensors;
