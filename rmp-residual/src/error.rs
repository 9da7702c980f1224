use candle_core::DType;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResidualError {
    #[error("motion policy config not found at {}", .0.display())]
    PolicyConfigNotFound(PathBuf),

    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] serde_json::Error),

    #[error("malformed yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("motion policy config is for robot {found}, expected {expected}")]
    RobotMismatch { expected: String, found: String },

    #[error("residual action must be a float tensor, got {0:?}")]
    ActionDType(DType),

    #[error("residual action has shape {actual:?}, reference action has shape {expected:?}")]
    ActionShape {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
}
