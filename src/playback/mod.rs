pub mod animator;
pub mod clock;
pub mod scheduler;
