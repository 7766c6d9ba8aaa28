//! # Ghostpaw Control Plane
//!
//! Role-gated facade over spirit lifecycle control and relationship profiles.
//!
//! ## Overview
//!
//! The dashboard and the health monitor go through [`GhostpawControlPlane`]
//! rather than the alert intake directly. It:
//!
//! - Checks the caller's registry role before service actions, prompt
//!   answers, profile changes and decommissioning
//! - Answers dashboard queries (spirit state, behavioral style)
//! - Forwards monitor alerts unchanged
//!
//! Roles come precomputed on the [`RequestContext`]; `reader` may only query,
//! `maintainer` may act on services, `admin` and `owner` may decommission.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ghostpaw_control::{GhostpawControlPlane, RequestContext, Role};
//! use ghostpaw_health::{AlertIntake, LifecycleConfig, LifecyclePorts};
//! use ghostpaw_types::{ServiceAction, SpiritId};
//!
//! # async fn example() {
//! let intake = Arc::new(AlertIntake::new(
//!     LifecycleConfig::default(),
//!     LifecyclePorts::tracing_only(),
//! ));
//! let control_plane = GhostpawControlPlane::new(intake);
//!
//! let ctx = RequestContext::user("mel", Role::Maintainer);
//! control_plane
//!     .manage_service(&SpiritId::new("eira"), ServiceAction::Restart, &ctx)
//!     .await
//!     .unwrap();
//! # }
//! ```

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod context;
pub mod control_plane;
pub mod error;
pub mod operations;

pub use context::{Actor, RequestContext, Role};
pub use control_plane::GhostpawControlPlane;
pub use error::{ControlPlaneError, Result};
pub use operations::ControlPlaneOperation;
