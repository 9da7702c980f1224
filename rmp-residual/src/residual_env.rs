use crate::{
    config::{ConfigMap, ResidualEnvConfig},
    env_builder::BaseEnvironmentBuilder,
    error::ResidualError,
    policy::{MotionPolicy, MotionPolicyBuilder, PolicyGraphParams, ROBOT_NAME},
};
use anyhow::Result;
use candle_core::{Device, Tensor};
use rmp_core::{
    env::{BaseEnvironment, Env, EnvironmentDescription, Goal, JointState, Obstacles, SnapShot},
    numeric::{NumericPrecision, batched_rows, batched_tensor, flat_values},
    tensors::{GoalTensor, ObstacleTensor, ReferenceAction},
};
use tracing::{debug, info, trace};

/// Adds a residual action on top of a motion policy's reference action.
///
/// The base environment owns the simulation. This type only keeps the goal and obstacles in
/// the form the motion policy consumes and composes the action handed to the base `step`.
pub struct ResidualEnv<B: BaseEnvironment, P: MotionPolicy> {
    base: B,
    policy: P,
    config: ResidualEnvConfig,
    precision: NumericPrecision,
    device: Device,
    goal: Option<GoalTensor>,
    obstacles: Option<ObstacleTensor>,
}

impl<B: BaseEnvironment, P: MotionPolicy> ResidualEnv<B, P> {
    pub fn new<EB, PB>(
        config: Option<ConfigMap>,
        env_builder: &EB,
        policy_builder: &PB,
        device: &Device,
    ) -> Result<Self>
    where
        EB: BaseEnvironmentBuilder<Env = B>,
        PB: MotionPolicyBuilder<Policy = P>,
    {
        let config = ResidualEnvConfig::from_overrides(config)?;
        Self::from_config(config, env_builder, policy_builder, device)
    }

    pub fn from_config<EB, PB>(
        config: ResidualEnvConfig,
        env_builder: &EB,
        policy_builder: &PB,
        device: &Device,
    ) -> Result<Self>
    where
        EB: BaseEnvironmentBuilder<Env = B>,
        PB: MotionPolicyBuilder<Policy = P>,
    {
        let params = PolicyGraphParams {
            robot: ROBOT_NAME.to_owned(),
            config_path: config.policy_config_path()?,
            precision: config.dtype,
            offset: config.offset,
        };
        info!(
            robot = %params.robot,
            config_path = %params.config_path.display(),
            dtype = %params.precision,
            offset = params.offset,
            "building motion policy"
        );
        let policy = policy_builder.build_policy(&params, device)?;
        let base = env_builder.build_env(&config, device)?;
        Ok(Self {
            base,
            policy,
            precision: config.dtype,
            config,
            device: device.clone(),
            goal: None,
            obstacles: None,
        })
    }

    pub fn config(&self) -> &ResidualEnvConfig {
        &self.config
    }

    pub fn precision(&self) -> NumericPrecision {
        self.precision
    }

    pub fn base(&self) -> &B {
        &self.base
    }

    pub fn base_mut(&mut self) -> &mut B {
        &mut self.base
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    pub fn goal_tensor(&self) -> Option<&GoalTensor> {
        self.goal.as_ref()
    }

    pub fn obstacle_tensor(&self) -> Option<&ObstacleTensor> {
        self.obstacles.as_ref()
    }

    /// Samples a new goal from the base environment and caches it for the motion policy.
    pub fn regenerate_goal(&mut self) -> Result<(Goal, GoalTensor)> {
        let goal = self.base.generate_random_goal()?;
        let cached = self.refresh_goal_cache(&goal)?;
        Ok((goal, cached))
    }

    /// Samples new obstacles from the base environment and caches them for the motion policy.
    pub fn regenerate_obstacles(&mut self) -> Result<(Obstacles, ObstacleTensor)> {
        let obstacles = self.base.generate_random_obstacles()?;
        let cached = self.refresh_obstacle_cache(&obstacles)?;
        Ok((obstacles, cached))
    }

    /// Replaces the cached goal with a `(1, workspace_dim)` tensor of `goal`.
    pub fn refresh_goal_cache(&mut self, goal: &Goal) -> Result<GoalTensor> {
        let cached = GoalTensor(batched_tensor(&goal.position, self.precision, &self.device)?);
        debug!(goal_id = goal.id, position = ?goal.position, "goal cache refreshed");
        self.goal = Some(cached.clone());
        Ok(cached)
    }

    /// Replaces the cached obstacles with a `(1, n, workspace_dim + 1)` tensor of `obstacles`.
    /// On a shape error the previous cache is left in place.
    pub fn refresh_obstacle_cache(&mut self, obstacles: &Obstacles) -> Result<ObstacleTensor> {
        let row_len = self.base.workspace_dim() + 1;
        let cached = ObstacleTensor(batched_rows(
            &obstacles.features,
            row_len,
            self.precision,
            &self.device,
        )?);
        debug!(
            obstacle_ids = ?obstacles.ids,
            empty = obstacles.is_empty(),
            shape = ?cached.dims(),
            "obstacle cache refreshed"
        );
        self.obstacles = Some(cached.clone());
        Ok(cached)
    }

    /// Evaluates the motion policy at the live joint state and clips the result to the action
    /// space. The clipped action is a flat `f64` tensor whatever the policy precision.
    pub fn reference_action(&self) -> Result<ReferenceAction> {
        let JointState {
            positions,
            velocities,
        } = self.base.joint_state()?;
        let joint_positions = batched_tensor(&positions, self.precision, &self.device)?;
        let joint_velocities = batched_tensor(&velocities, self.precision, &self.device)?;
        let action = self.policy.evaluate(
            &joint_positions,
            &joint_velocities,
            self.obstacles.as_ref(),
            self.goal.as_ref(),
        )?;
        let action = flat_values(&action)?;
        let len = action.len();
        let action = Tensor::from_vec(action, len, &self.device)?;
        let clipped = self.base.env_description().action_space.clamp(&action)?;
        Ok(ReferenceAction(clipped))
    }

    /// Runs the motion policy, adds `residual` to its clipped output and steps the base
    /// environment with the sum. The snapshot of the base environment is returned as is.
    pub fn step_residual(&mut self, residual: &Tensor) -> Result<SnapShot<Tensor>> {
        let reference = self.reference_action()?;
        let action = compose_action(&reference, residual)?;
        trace!(action = ?flat_values(&action).ok(), "stepping base environment");
        self.base.step(action)
    }
}

/// `reference + residual`, computed in the wider of the two float dtypes.
///
/// The sum is not clipped again, so it may leave the action space bounds when the residual
/// pushes it out.
pub fn compose_action(reference: &Tensor, residual: &Tensor) -> Result<Tensor> {
    if reference.dims() != residual.dims() {
        return Err(ResidualError::ActionShape {
            expected: reference.dims().to_vec(),
            actual: residual.dims().to_vec(),
        }
        .into());
    }
    let Some(residual_precision) = NumericPrecision::from_dtype(residual.dtype()) else {
        return Err(ResidualError::ActionDType(residual.dtype()).into());
    };
    let Some(reference_precision) = NumericPrecision::from_dtype(reference.dtype()) else {
        return Err(ResidualError::ActionDType(reference.dtype()).into());
    };
    let dtype = reference_precision.promote(residual_precision).dtype();
    Ok(reference.to_dtype(dtype)?.add(&residual.to_dtype(dtype)?)?)
}

impl<B: BaseEnvironment, P: MotionPolicy> Env for ResidualEnv<B, P> {
    type Tensor = Tensor;

    /// Resets the simulator and samples a fresh goal and obstacle set.
    fn reset(&mut self, seed: u64) -> Result<Tensor> {
        self.goal = None;
        self.obstacles = None;
        self.base.reset(seed)?;
        self.regenerate_goal()?;
        self.regenerate_obstacles()?;
        self.base.observe()
    }

    fn step(&mut self, action: Tensor) -> Result<SnapShot<Tensor>> {
        self.step_residual(&action)
    }

    fn env_description(&self) -> EnvironmentDescription {
        self.base.env_description()
    }
}
