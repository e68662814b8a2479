//! Agent tree - agent definitions, the immutable agent type, and the registry
//!
//! A coordinator sits at the root; its children are specialists it may
//! delegate to. The tree is validated once at construction and read-only
//! afterwards.

pub mod agent;
pub mod definition;
pub mod registry;

pub use agent::Agent;
pub use definition::AgentDefinition;
pub use registry::AgentRegistry;
