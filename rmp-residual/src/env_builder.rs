use crate::config::ResidualEnvConfig;
use anyhow::Result;
use candle_core::Device;
use rmp_core::env::BaseEnvironment;

/// Builds the base environment from the merged configuration.
pub trait BaseEnvironmentBuilder {
    type Env: BaseEnvironment;

    fn build_env(&self, config: &ResidualEnvConfig, device: &Device) -> Result<Self::Env>;
}

impl<E: BaseEnvironment, F> BaseEnvironmentBuilder for F
where
    F: Fn(&ResidualEnvConfig, &Device) -> Result<E>,
{
    type Env = E;

    fn build_env(&self, config: &ResidualEnvConfig, device: &Device) -> Result<Self::Env> {
        (self)(config, device)
    }
}
