use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("unknown numeric precision tag: {0}")]
    UnknownPrecision(String),

    #[error("cannot split {len} values into rows of {row_len}")]
    RowLength { len: usize, row_len: usize },

    #[error("lower bound has {low} values, upper bound has {high}")]
    BoundsLength { low: usize, high: usize },

    #[error("a discrete space has no bounds to clamp against")]
    DiscreteClamp,
}
