//! Stand-ins for a robot simulation and a motion policy, used by the tests and the demo.

use crate::{
    config::ResidualEnvConfig,
    error::ResidualError,
    policy::{MotionPolicy, MotionPolicyBuilder, PolicyGraphConfig, PolicyGraphParams},
};
use anyhow::Result;
use candle_core::{Device, Tensor};
use rand::{Rng, SeedableRng, rngs::StdRng};
use rmp_core::{
    env::{
        BaseEnvironment, BodyId, Env, EnvironmentDescription, Goal, JointState, Obstacles,
        SnapShot, Space, StepInfo,
    },
    numeric::flat_values,
    tensors::{GoalTensor, ObstacleTensor},
};
use serde::Deserialize;
use std::cell::RefCell;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PointMassOptions {
    pub workspace_dim: usize,
    pub num_obstacles: usize,
    pub obstacle_radius: f64,
    pub action_bound: f64,
    pub dt: f64,
    pub max_steps: usize,
    pub goal_tolerance: f64,
}

impl Default for PointMassOptions {
    fn default() -> Self {
        Self {
            workspace_dim: 3,
            num_obstacles: 2,
            obstacle_radius: 0.1,
            action_bound: 1.0,
            dt: 0.05,
            max_steps: 100,
            goal_tolerance: 0.02,
        }
    }
}

/// A point whose coordinates double as joint positions and whose actions are velocities.
///
/// Actions are applied as received, without clipping, and the last one is kept around so
/// callers can check what the environment was stepped with.
pub struct PointMassEnv {
    options: PointMassOptions,
    device: Device,
    action_space: Space,
    rng: StdRng,
    positions: Vec<f64>,
    velocities: Vec<f64>,
    goal: Vec<f64>,
    t: usize,
    next_body_id: BodyId,
    pub last_action: Option<Vec<f64>>,
    pub goals_generated: usize,
    pub obstacles_generated: usize,
    /// When set, obstacle generation returns this instead of sampling.
    pub forced_obstacles: Option<Obstacles>,
}

impl PointMassEnv {
    pub fn new(options: PointMassOptions, device: &Device) -> Result<Self> {
        let dim = options.workspace_dim;
        let bound = options.action_bound;
        let action_space = Space::bounded(&vec![-bound; dim], &vec![bound; dim], device)?;
        Ok(Self {
            options,
            device: device.clone(),
            action_space,
            rng: StdRng::seed_from_u64(0),
            positions: vec![0.; dim],
            velocities: vec![0.; dim],
            goal: vec![0.; dim],
            t: 0,
            next_body_id: 0,
            last_action: None,
            goals_generated: 0,
            obstacles_generated: 0,
            forced_obstacles: None,
        })
    }

    pub fn build(config: &ResidualEnvConfig, device: &Device) -> Result<Self> {
        Self::new(config.extra_as()?, device)
    }

    pub fn options(&self) -> &PointMassOptions {
        &self.options
    }

    pub fn set_joint_state(&mut self, positions: Vec<f64>, velocities: Vec<f64>) {
        self.positions = positions;
        self.velocities = velocities;
    }

    fn distance_to_goal(&self) -> f64 {
        self.positions
            .iter()
            .zip(&self.goal)
            .map(|(p, g)| (p - g) * (p - g))
            .sum::<f64>()
            .sqrt()
    }

    fn body_id(&mut self) -> BodyId {
        let id = self.next_body_id;
        self.next_body_id += 1;
        id
    }

    fn sample_point(&mut self) -> Vec<f64> {
        (0..self.options.workspace_dim)
            .map(|_| self.rng.random_range(-1.0..1.0))
            .collect()
    }
}

impl Env for PointMassEnv {
    type Tensor = Tensor;

    fn reset(&mut self, seed: u64) -> Result<Tensor> {
        self.rng = StdRng::seed_from_u64(seed);
        self.positions = vec![0.; self.options.workspace_dim];
        self.velocities = vec![0.; self.options.workspace_dim];
        self.t = 0;
        self.last_action = None;
        self.observe()
    }

    fn step(&mut self, action: Tensor) -> Result<SnapShot<Tensor>> {
        let action = flat_values(&action)?;
        for (p, v) in self.positions.iter_mut().zip(&action) {
            *p += self.options.dt * v;
        }
        self.velocities = action.clone();
        self.last_action = Some(action);
        self.t += 1;
        let distance = self.distance_to_goal();
        let info = StepInfo::default()
            .with("distance", distance)
            .with("step", self.t);
        Ok(SnapShot {
            state: self.observe()?,
            reward: -distance as f32,
            terminated: distance < self.options.goal_tolerance,
            truncated: self.t >= self.options.max_steps,
            info,
        })
    }

    fn env_description(&self) -> EnvironmentDescription {
        let dim = self.options.workspace_dim;
        EnvironmentDescription::new(
            Space::continous_from_dims(vec![3 * dim]),
            self.action_space.clone(),
        )
    }
}

impl BaseEnvironment for PointMassEnv {
    fn generate_random_goal(&mut self) -> Result<Goal> {
        self.goal = self.sample_point();
        self.goals_generated += 1;
        Ok(Goal {
            position: self.goal.clone(),
            id: self.body_id(),
        })
    }

    fn generate_random_obstacles(&mut self) -> Result<Obstacles> {
        self.obstacles_generated += 1;
        if let Some(obstacles) = &self.forced_obstacles {
            return Ok(obstacles.clone());
        }
        let mut obstacles = Obstacles::empty();
        for _ in 0..self.options.num_obstacles {
            obstacles.features.extend(self.sample_point());
            obstacles.features.push(self.options.obstacle_radius);
            let id = self.body_id();
            obstacles.ids.push(id);
        }
        Ok(obstacles)
    }

    fn joint_state(&self) -> Result<JointState> {
        Ok(JointState {
            positions: self.positions.clone(),
            velocities: self.velocities.clone(),
        })
    }

    fn observe(&self) -> Result<Tensor> {
        let obs: Vec<f32> = self
            .positions
            .iter()
            .chain(&self.velocities)
            .chain(&self.goal)
            .map(|x| *x as f32)
            .collect();
        let len = obs.len();
        Ok(Tensor::from_vec(obs, len, &self.device)?)
    }

    fn workspace_dim(&self) -> usize {
        self.options.workspace_dim
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolicyCall {
    pub joint_positions: Vec<f64>,
    pub joint_velocities: Vec<f64>,
    pub goal: Option<Vec<f64>>,
    pub obstacle_dims: Option<Vec<usize>>,
}

/// Always answers with the same reference action and records what it was asked.
pub struct ConstantPolicy {
    pub action: Vec<f64>,
    pub params: PolicyGraphParams,
    pub calls: RefCell<Vec<PolicyCall>>,
}

impl MotionPolicy for ConstantPolicy {
    fn evaluate(
        &self,
        joint_positions: &Tensor,
        joint_velocities: &Tensor,
        obstacles: Option<&ObstacleTensor>,
        goal: Option<&GoalTensor>,
    ) -> Result<Tensor> {
        self.calls.borrow_mut().push(PolicyCall {
            joint_positions: flat_values(joint_positions)?,
            joint_velocities: flat_values(joint_velocities)?,
            goal: goal.map(|g| flat_values(g)).transpose()?,
            obstacle_dims: obstacles.map(|o| o.dims().to_vec()),
        });
        let len = self.action.len();
        let action = Tensor::from_slice(&self.action, (1, len), joint_positions.device())?;
        Ok(action.to_dtype(joint_positions.dtype())?)
    }
}

pub struct ConstantPolicyBuilder(pub Vec<f64>);

impl MotionPolicyBuilder for ConstantPolicyBuilder {
    type Policy = ConstantPolicy;

    fn build_policy(&self, params: &PolicyGraphParams, _device: &Device) -> Result<Self::Policy> {
        Ok(ConstantPolicy {
            action: self.0.clone(),
            params: params.clone(),
            calls: RefCell::new(vec![]),
        })
    }
}

/// Drives the joints straight towards the goal, `gain * (goal - q)`. Obstacles are ignored.
#[derive(Debug, Clone)]
pub struct GoalAttractorPolicy {
    pub gain: f64,
}

impl MotionPolicy for GoalAttractorPolicy {
    fn evaluate(
        &self,
        joint_positions: &Tensor,
        _joint_velocities: &Tensor,
        _obstacles: Option<&ObstacleTensor>,
        goal: Option<&GoalTensor>,
    ) -> Result<Tensor> {
        let Some(goal) = goal else {
            return Ok(joint_positions.zeros_like()?);
        };
        Ok((goal.sub(joint_positions)? * self.gain)?)
    }
}

/// Takes the gain of [`GoalAttractorPolicy`] from `rmp_params.cspace_target_rmp.position_gain`
/// in the motion policy config. A config written for another robot is rejected.
pub struct GoalAttractorBuilder;

impl MotionPolicyBuilder for GoalAttractorBuilder {
    type Policy = GoalAttractorPolicy;

    fn build_policy(&self, params: &PolicyGraphParams, _device: &Device) -> Result<Self::Policy> {
        let config = PolicyGraphConfig::load(&params.config_path)?;
        if let Some(found) = config.robot_name() {
            if found != params.robot {
                return Err(ResidualError::RobotMismatch {
                    expected: params.robot.clone(),
                    found: found.to_owned(),
                }
                .into());
            }
        }
        let gain = config
            .get_f64(&["rmp_params", "cspace_target_rmp", "position_gain"])
            .unwrap_or(1.0);
        Ok(GoalAttractorPolicy { gain })
    }
}
