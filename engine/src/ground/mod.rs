//! Ground models
//!
//! Named surface parameter sets read from `ground_models.cfg`:
//! - [`model`] - the parameter record and its handle
//! - [`config`] - INI-shaped reader shared with other terrain configs
//! - [`registry`] - loading, base resolution and lookup

pub mod config;
pub mod model;
pub mod registry;

pub use model::{FxType, GroundModel, GroundModelId};
pub use registry::{DEFAULT_GROUND_NAME, DEFAULT_SOLID_NAME, GroundModelRegistry, LATEST_VERSION};
