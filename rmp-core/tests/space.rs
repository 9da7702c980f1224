use anyhow::Result;
use approx::assert_abs_diff_eq;
use candle_core::{DType, Device, Tensor};
use rmp_core::{
    env::{SnapShot, Space, StepInfo},
    error::CoreError,
    numeric::{NumericPrecision, batched_tensor, flat_values},
};

#[test]
fn clamp_to_bounds() -> Result<()> {
    let space = Space::bounded(&[-1., -2.], &[1., 2.], &Device::Cpu)?;
    assert_eq!(space.size(), 2);
    let t = Tensor::new(&[3f32, -5.], &Device::Cpu)?;
    let clamped = space.clamp(&t)?;
    assert_eq!(clamped.dtype(), DType::F32);
    assert_eq!(flat_values(&clamped)?, vec![1., -2.]);
    Ok(())
}

#[test]
fn bounds_of_different_length_are_rejected() {
    let err = Space::bounded(&[-1., -1.], &[1.], &Device::Cpu).err().unwrap();
    assert!(matches!(
        err.downcast_ref::<CoreError>(),
        Some(CoreError::BoundsLength { low: 2, high: 1 })
    ));
}

#[test]
fn clamp_with_one_sided_bound() -> Result<()> {
    let max = Tensor::new(&[0.5f64, 0.5], &Device::Cpu)?;
    let space = Space::Continous {
        min: None,
        max: Some(max),
        size: 2,
    };
    let t = Tensor::new(&[-10f64, 10.], &Device::Cpu)?;
    assert_eq!(flat_values(&space.clamp(&t)?)?, vec![-10., 0.5]);
    Ok(())
}

#[test]
fn unbounded_space_is_identity() -> Result<()> {
    let space = Space::continous_from_dims(vec![3]);
    let t = Tensor::new(&[-7f32, 0., 7.], &Device::Cpu)?;
    assert_eq!(flat_values(&space.clamp(&t)?)?, vec![-7., 0., 7.]);
    Ok(())
}

#[test]
fn discrete_space_cannot_clamp() -> Result<()> {
    let t = Tensor::new(&[1f32], &Device::Cpu)?;
    let err = Space::Discrete(2).clamp(&t).err().unwrap();
    assert!(matches!(
        err.downcast_ref::<CoreError>(),
        Some(CoreError::DiscreteClamp)
    ));
    Ok(())
}

#[test]
fn batched_tensor_keeps_values() -> Result<()> {
    let values = [0.1, -0.2, 0.3];
    let t = batched_tensor(&values, NumericPrecision::BF16, &Device::Cpu)?;
    assert_eq!(t.dims(), &[1, 3]);
    assert_eq!(t.dtype(), DType::BF16);
    for (got, want) in flat_values(&t)?.iter().zip(values) {
        assert_abs_diff_eq!(*got, want, epsilon = 1e-2);
    }
    Ok(())
}

#[test]
fn snapshot_done() -> Result<()> {
    let state = Tensor::zeros(1, DType::F32, &Device::Cpu)?;
    let mut snapshot = SnapShot {
        state,
        reward: 0.,
        terminated: false,
        truncated: false,
        info: StepInfo::default().with("distance", 0.5),
    };
    assert!(!snapshot.done());
    snapshot.truncated = true;
    assert!(snapshot.done());
    assert_eq!(snapshot.info.fields["distance"], 0.5);
    Ok(())
}
