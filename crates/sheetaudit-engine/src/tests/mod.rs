mod common;
mod cycle_detection;
mod data_quality;
mod determinism;
mod error_propagation;
mod visibility;
