//! Per-stem pipeline stages, executed in order by `run_pipeline`

pub mod frame_analysis;
pub mod scheduling;
pub mod segmentation;
pub mod velocity;
