use crate::error::CoreError;
use anyhow::Result;
use candle_core::{Device, Tensor};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub enum Space {
    Discrete(usize),
    Continous {
        min: Option<Tensor>,
        max: Option<Tensor>,
        size: usize,
    },
}

impl Space {
    pub fn continous_from_dims(dims: Vec<usize>) -> Self {
        Self::Continous {
            min: None,
            max: None,
            size: dims.iter().product(),
        }
    }

    pub fn bounded(low: &[f64], high: &[f64], device: &Device) -> Result<Self> {
        if low.len() != high.len() {
            return Err(CoreError::BoundsLength {
                low: low.len(),
                high: high.len(),
            }
            .into());
        }
        let size = low.len();
        let min = Tensor::from_slice(low, size, device)?;
        let max = Tensor::from_slice(high, size, device)?;
        Ok(Self::Continous {
            min: Some(min),
            max: Some(max),
            size,
        })
    }

    pub fn size(&self) -> usize {
        match &self {
            Self::Discrete(size) => *size,
            Self::Continous { size, .. } => *size,
        }
    }

    /// Clips `t` elementwise against the bounds that are present. The bounds are cast to the
    /// dtype of `t` first, so clip an `f64` tensor to keep them exact.
    pub fn clamp(&self, t: &Tensor) -> Result<Tensor> {
        let Self::Continous { min, max, .. } = self else {
            return Err(CoreError::DiscreteClamp.into());
        };
        let mut clamped = t.clone();
        if let Some(min) = min {
            clamped = clamped.broadcast_maximum(&min.to_dtype(t.dtype())?)?;
        }
        if let Some(max) = max {
            clamped = clamped.broadcast_minimum(&max.to_dtype(t.dtype())?)?;
        }
        Ok(clamped)
    }
}

#[derive(Debug, Clone)]
pub struct EnvironmentDescription {
    pub observation_space: Space,
    pub action_space: Space,
}

impl EnvironmentDescription {
    pub fn new(observation_space: Space, action_space: Space) -> Self {
        Self {
            observation_space,
            action_space,
        }
    }

    pub fn action_size(&self) -> usize {
        self.action_space.size()
    }

    pub fn observation_size(&self) -> usize {
        self.observation_space.size()
    }
}

/// Free form diagnostics attached to a step by the environment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepInfo {
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl StepInfo {
    pub fn with(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.fields.insert(key.to_owned(), value.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct SnapShot<T> {
    pub state: T,
    pub reward: f32,
    pub terminated: bool,
    pub truncated: bool,
    pub info: StepInfo,
}

impl<T> SnapShot<T> {
    pub fn done(&self) -> bool {
        self.terminated || self.truncated
    }
}

pub trait Env {
    type Tensor: Clone;

    fn reset(&mut self, seed: u64) -> Result<Self::Tensor>;
    fn step(&mut self, action: Self::Tensor) -> Result<SnapShot<Self::Tensor>>;
    fn env_description(&self) -> EnvironmentDescription;
}

pub type BodyId = u32;

#[derive(Debug, Clone, PartialEq)]
pub struct JointState {
    pub positions: Vec<f64>,
    pub velocities: Vec<f64>,
}

/// A target point in the workspace.
#[derive(Debug, Clone, PartialEq)]
pub struct Goal {
    pub position: Vec<f64>,
    pub id: BodyId,
}

/// Obstacles flattened row by row, each row being a workspace position followed by a radius.
#[derive(Debug, Clone, PartialEq)]
pub struct Obstacles {
    pub features: Vec<f64>,
    pub ids: Vec<BodyId>,
}

impl Obstacles {
    pub fn empty() -> Self {
        Self {
            features: vec![],
            ids: vec![],
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// A robot simulation that exposes the hooks a residual policy needs on top of plain stepping.
///
/// `reset` only restores the simulator. Goals and obstacles are sampled through
/// [`BaseEnvironment::generate_random_goal`] and [`BaseEnvironment::generate_random_obstacles`]
/// by whoever owns the environment, so that it can keep its own view of them in sync.
pub trait BaseEnvironment: Env<Tensor = Tensor> {
    fn generate_random_goal(&mut self) -> Result<Goal>;

    fn generate_random_obstacles(&mut self) -> Result<Obstacles>;

    /// Live joint positions and velocities of the robot.
    fn joint_state(&self) -> Result<JointState>;

    /// The observation for the current simulator state.
    fn observe(&self) -> Result<Tensor>;

    fn workspace_dim(&self) -> usize;
}
