pub mod constant;
pub mod deployment;
pub mod params;
pub mod queue;
pub mod task;
