pub mod exporter;
pub mod source;
