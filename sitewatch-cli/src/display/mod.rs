pub mod progress;
pub mod spinner;

pub use progress::{ProgressWriterFactory, RoundProgress};
pub use spinner::Spinner;
