//! Classification of feature windows
//!
//! - Genre labels and prediction/response types
//! - The opaque classifier seam and argmax/latency bookkeeping
//! - Smoothing of successive stream predictions

pub mod classifier;
pub mod result;
pub mod smoother;

pub use classifier::{classify, GenreClassifier};
pub use result::{ChunkResponse, Genre, Prediction, GENRES};
pub use smoother::{PredictionSmoother, SmoothedPrediction};
