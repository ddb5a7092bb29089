//! Stateless repositories — every method takes `&Connection`.
//!
//! | Module | Table(s) |
//! |--------|----------|
//! | `session` | `sessions` |
//! | `message` | `messages` |
//! | `context` | `context_items`, `session_context_links` |
//! | `job` | `jobs` |

pub mod context;
pub mod job;
pub mod message;
pub mod session;
