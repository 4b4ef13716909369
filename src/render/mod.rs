pub mod cpu;
pub mod scene;
