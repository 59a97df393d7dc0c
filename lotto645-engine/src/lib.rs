pub mod archive;
pub mod config;
pub mod error;
pub mod probability;
pub mod recommend;
pub mod sampler;
pub mod selector;
pub mod source;

pub use error::{EngineError, EngineResult};
