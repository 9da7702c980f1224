use candle_core::Tensor;
use derive_more::{Deref, DerefMut, Display};

/// Goal as the motion policy consumes it, shape `(1, workspace_dim)`.
#[derive(Deref, DerefMut, Debug, Display, Clone)]
pub struct GoalTensor(pub Tensor);

/// Obstacles as the motion policy consumes them, shape `(1, n, workspace_dim + 1)`.
#[derive(Deref, DerefMut, Debug, Display, Clone)]
pub struct ObstacleTensor(pub Tensor);

/// Motion policy output flattened to `f64` and clipped to the action space.
#[derive(Deref, DerefMut, Debug, Display, Clone)]
pub struct ReferenceAction(pub Tensor);
