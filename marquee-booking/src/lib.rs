pub mod pipeline;

pub use pipeline::{BookingQueue, PipelineConfig};
