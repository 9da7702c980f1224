use crate::error::ResidualError;
use anyhow::Result;
use candle_core::{Device, Tensor};
use rmp_core::{
    numeric::NumericPrecision,
    tensors::{GoalTensor, ObstacleTensor},
};
use std::path::{Path, PathBuf};

pub const ROBOT_NAME: &str = "xarm7";

/// Everything a motion policy needs to be built.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyGraphParams {
    pub robot: String,
    pub config_path: PathBuf,
    pub precision: NumericPrecision,
    pub offset: f64,
}

/// A pretrained policy mapping robot state, obstacles and goal to a reference action.
///
/// Inputs carry a leading batch dimension of one. The returned action is batched as well.
pub trait MotionPolicy {
    fn evaluate(
        &self,
        joint_positions: &Tensor,
        joint_velocities: &Tensor,
        obstacles: Option<&ObstacleTensor>,
        goal: Option<&GoalTensor>,
    ) -> Result<Tensor>;
}

pub trait MotionPolicyBuilder {
    type Policy: MotionPolicy;

    fn build_policy(&self, params: &PolicyGraphParams, device: &Device) -> Result<Self::Policy>;
}

impl<P: MotionPolicy, F> MotionPolicyBuilder for F
where
    F: Fn(&PolicyGraphParams, &Device) -> Result<P>,
{
    type Policy = P;

    fn build_policy(&self, params: &PolicyGraphParams, device: &Device) -> Result<Self::Policy> {
        (self)(params, device)
    }
}

/// The motion policy config file, kept as an untyped yaml tree.
#[derive(Debug, Clone)]
pub struct PolicyGraphConfig(pub serde_yaml::Value);

impl PolicyGraphConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ResidualError> {
        let file = std::fs::File::open(path)?;
        let rdr = std::io::BufReader::new(file);
        Ok(Self(serde_yaml::from_reader(rdr)?))
    }

    pub fn get(&self, keys: &[&str]) -> Option<&serde_yaml::Value> {
        keys.iter().try_fold(&self.0, |node, key| node.get(*key))
    }

    pub fn get_f64(&self, keys: &[&str]) -> Option<f64> {
        self.get(keys).and_then(serde_yaml::Value::as_f64)
    }

    pub fn robot_name(&self) -> Option<&str> {
        self.get(&["robot_name"]).and_then(serde_yaml::Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_POLICY_CONFIG;

    #[test]
    fn shipped_config_parses() {
        let config = PolicyGraphConfig::load(DEFAULT_POLICY_CONFIG).unwrap();
        assert_eq!(config.robot_name(), Some(ROBOT_NAME));
        assert_eq!(
            config.get_f64(&["rmp_params", "cspace_target_rmp", "position_gain"]),
            Some(1.0)
        );
        assert!(config.get(&["rmp_params", "no_such_rmp"]).is_none());
    }
}
