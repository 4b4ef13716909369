pub mod cadence;
pub mod queue;
pub mod resolve;
pub mod step;
