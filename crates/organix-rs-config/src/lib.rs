//! OrganiX configuration: the serde model shared by every crate and the
//! layered JSON5 loader that produces it.

mod error;
mod loader;
mod model;

pub use error::ConfigError;
pub use loader::{ConfigLayer, ConfigLayerSource, LayeredConfig, LayeredConfigOptions};
pub use model::*;
