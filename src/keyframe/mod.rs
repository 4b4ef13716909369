pub mod ease;
pub mod sequence;
