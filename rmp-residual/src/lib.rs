pub mod config;
pub mod env_builder;
pub mod error;
pub mod policy;
pub mod residual_env;

#[cfg(feature = "test-utils")]
pub mod test_utils;
