//! Shared domain types, configuration and the static administrative
//! hierarchy for the geocerca location-resolution pipeline.

pub mod app_config;
pub mod config;
pub mod error;
pub mod geo;
pub mod hierarchy;
pub mod location;
pub mod normalize;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use error::{ConfigError, CoreError};
pub use geo::Coordinate;
pub use hierarchy::{load_hierarchy, parse_hierarchy, HierarchyNode, HierarchyTable, NodeKind};
pub use location::{
    AssignmentSource, HierarchyAssignment, LocationUpdate, MicroLocationTag, TagKind,
};
pub use normalize::{is_generic, normalize};
