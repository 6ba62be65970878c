//! # System Interaction Layer
//!
//! Boundary between the environment logic and the external `hatch` tool.
//!
//! ## Modules
//!
//! - **`executor`**: spawns external processes through `tokio::process`, captures their
//!   standard output and surfaces failures (with the tool's stderr) as `ExternalToolError`.
//! - **`hatch_cli`**: builds the `hatch env show/find/create/remove` invocations, always
//!   scoped to a project root, and parses what Hatch prints.

pub mod executor;
pub mod hatch_cli;
