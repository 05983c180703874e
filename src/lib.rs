pub mod batch;
pub mod config;
pub mod error;
pub mod geometry;
pub mod logging;
pub mod pipeline;
pub mod render;
pub mod session;
pub mod ui;

pub use config::Config;
pub use error::{ConfigError, PrepError, PrepResult};
pub use geometry::{Point, Rect, Scaler};
pub use pipeline::{run, Operator, Outcome, RunSummary};
