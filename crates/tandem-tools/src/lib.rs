//! # tandem-tools
//!
//! The tool seam: the [`AgentTool`] capability trait, the [`ToolRegistry`]
//! the loop dispatches against, and shared test utilities.
//!
//! Concrete production tools live with their host applications; this
//! crate defines the contract they implement.

#![deny(unsafe_code)]

pub mod errors;
pub mod registry;
pub mod testutil;
pub mod traits;

pub use errors::{ToolError, ToolResult};
pub use registry::ToolRegistry;
pub use traits::{AgentTool, ContextArtifact, ToolContext, ToolOutput};
