
pub mod compiler;
pub mod queue;
pub mod service;
