//! Groundwork core
//!
//! Model, KDL parser and project loader for Groundwork's declarative
//! infrastructure configuration. A project is a set of KDL files declaring
//! providers and resources; loading yields a [`Blueprint`] whose resources
//! keep their declaration order.

pub mod discovery;
pub mod error;
pub mod loader;
pub mod model;
pub mod parser;
pub mod template;

// Re-exports
pub use discovery::{DiscoveredFiles, discover_files, find_project_root};
pub use error::{CoreError, Result};
pub use loader::{load_project, load_project_from_root};
pub use model::{
    AttrValue, Blueprint, ProviderDecl, Reference, ResourceDecl, ResourceId,
};
pub use parser::{parse_kdl_file, parse_kdl_string};
pub use template::{TemplateProcessor, Variables, extract_variables};
