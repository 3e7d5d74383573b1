//! # splitdb: Bot-Safe Split Testing Engine
//!
//! **Version**: 0.1.0
//!
//! splitdb assigns visitors to experiment variants, holds every persistent
//! write until the visitor is confirmed human, merges anonymous history into
//! an authenticated subject on sign-in, records each conversion goal at most
//! once per subject, and computes multi-stage funnel reports per variant.
//!
//! ## Design Principles (Toyota Way Aligned)
//!
//! - **Muda elimination**: Bots never produce enrollment or goal rows
//! - **Poka-Yoke safety**: Unique (subject, experiment) and (subject, goal) rows
//!   enforced by atomic insert-if-absent
//! - **Jidoka**: Corrupt deferred actions stop the line instead of being dropped
//!
//! ## Example Usage
//!
//! ```rust
//! use splitdb::visit::{Coordinator, VisitRequest};
//! use splitdb::{SplitConfig, SplitStore};
//!
//! # fn main() -> splitdb::Result<()> {
//! let store = SplitStore::new();
//! let config = SplitConfig::default();
//!
//! let mut visit = Coordinator::new(&store, &config, None, VisitRequest::new("example.com"))?;
//! let variant = visit.declare_and_enroll("signup_button", ["red", "blue"])?;
//! visit.log_goal("viewed_signup", None);
//! visit.confirm_human()?;
//!
//! let subject = visit.get_subject()?;
//! assert_eq!(store.enrollment("signup_button", subject).map(|e| e.variant().to_string()), Some(variant));
//! assert!(store.goal_record(subject, "viewed_signup").is_some());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod report;
pub mod session;
pub mod store;
pub mod visit;

pub use config::SplitConfig;
pub use error::{Error, Result};
pub use store::SplitStore;
