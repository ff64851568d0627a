//! Configuration value objects shared by the application and presentation
//! layers.

mod output_format;

pub use output_format::OutputFormat;
