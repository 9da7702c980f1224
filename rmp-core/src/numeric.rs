use crate::error::CoreError;
use anyhow::Result;
use candle_core::{DType, Device, Tensor};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Floating point precision used for every tensor handed to the motion policy.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NumericPrecision {
    #[serde(rename = "float16")]
    F16,
    #[serde(rename = "bfloat16")]
    BF16,
    #[default]
    #[serde(rename = "float32")]
    F32,
    #[serde(rename = "float64")]
    F64,
}

impl NumericPrecision {
    pub fn dtype(&self) -> DType {
        match self {
            NumericPrecision::F16 => DType::F16,
            NumericPrecision::BF16 => DType::BF16,
            NumericPrecision::F32 => DType::F32,
            NumericPrecision::F64 => DType::F64,
        }
    }

    pub fn from_dtype(dtype: DType) -> Option<NumericPrecision> {
        match dtype {
            DType::F16 => Some(NumericPrecision::F16),
            DType::BF16 => Some(NumericPrecision::BF16),
            DType::F32 => Some(NumericPrecision::F32),
            DType::F64 => Some(NumericPrecision::F64),
            _ => None,
        }
    }

    /// The narrowest precision that holds every value of both `self` and `other`.
    pub fn promote(self, other: NumericPrecision) -> NumericPrecision {
        use NumericPrecision::*;
        match (self, other) {
            (F64, _) | (_, F64) => F64,
            (F32, _) | (_, F32) | (F16, BF16) | (BF16, F16) => F32,
            (F16, F16) => F16,
            (BF16, BF16) => BF16,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NumericPrecision::F16 => "float16",
            NumericPrecision::BF16 => "bfloat16",
            NumericPrecision::F32 => "float32",
            NumericPrecision::F64 => "float64",
        }
    }
}

impl fmt::Display for NumericPrecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NumericPrecision {
    type Err = CoreError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "float16" => Ok(NumericPrecision::F16),
            "bfloat16" => Ok(NumericPrecision::BF16),
            "float32" => Ok(NumericPrecision::F32),
            "float64" => Ok(NumericPrecision::F64),
            other => Err(CoreError::UnknownPrecision(other.to_owned())),
        }
    }
}

/// Wraps a single vector into a `(1, n)` batch.
pub fn batched_tensor(values: &[f64], precision: NumericPrecision, device: &Device) -> Result<Tensor> {
    let t = Tensor::from_slice(values, (1, values.len()), device)?;
    Ok(t.to_dtype(precision.dtype())?)
}

/// Wraps a flat list of fixed sized rows into a `(1, rows, row_len)` batch.
pub fn batched_rows(
    values: &[f64],
    row_len: usize,
    precision: NumericPrecision,
    device: &Device,
) -> Result<Tensor> {
    if row_len == 0 || values.len() % row_len != 0 {
        return Err(CoreError::RowLength {
            len: values.len(),
            row_len,
        }
        .into());
    }
    let rows = values.len() / row_len;
    let t = batched_tensor(values, precision, device)?;
    Ok(t.reshape((1, rows, row_len))?)
}

/// Flattens a tensor of any rank back into plain values.
pub fn flat_values(tensor: &Tensor) -> Result<Vec<f64>> {
    Ok(tensor.flatten_all()?.to_dtype(DType::F64)?.to_vec1()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precision_tags() -> Result<()> {
        for p in [
            NumericPrecision::F16,
            NumericPrecision::BF16,
            NumericPrecision::F32,
            NumericPrecision::F64,
        ] {
            assert_eq!(p.as_str().parse::<NumericPrecision>()?, p);
            assert_eq!(NumericPrecision::from_dtype(p.dtype()), Some(p));
        }
        assert!("int8".parse::<NumericPrecision>().is_err());
        assert_eq!(NumericPrecision::from_dtype(DType::U32), None);
        Ok(())
    }

    #[test]
    fn promotion_never_narrows() {
        use NumericPrecision::*;
        assert_eq!(F16.promote(F16), F16);
        assert_eq!(F16.promote(BF16), F32);
        assert_eq!(BF16.promote(F32), F32);
        assert_eq!(F32.promote(F64), F64);
        assert_eq!(F64.promote(F16), F64);
    }

    #[test]
    fn rows_are_batched() -> Result<()> {
        let values = [0., 1., 2., 3., 4., 5., 6., 7.];
        let t = batched_rows(&values, 4, NumericPrecision::F64, &Device::Cpu)?;
        assert_eq!(t.dims(), &[1, 2, 4]);
        assert_eq!(flat_values(&t)?, values.to_vec());
        assert!(batched_rows(&values, 3, NumericPrecision::F64, &Device::Cpu).is_err());
        assert!(batched_rows(&values, 0, NumericPrecision::F64, &Device::Cpu).is_err());
        Ok(())
    }
}
