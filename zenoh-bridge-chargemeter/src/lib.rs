//! Zenoh bridge mirroring a charger as a DC source.
//!
//! The bridge polls a charger service on the bus once per interval and
//! republishes its readings under a virtual DC source identity.
//!
//! # Key Expressions
//!
//! ```text
//! venus/<service>/<path>
//! ```
//!
//! Where:
//! - `<service>` - Bus service name, e.g. `com.victronenergy.dcsource.ip22`
//! - `<path>` - Attribute path, e.g. `Dc/0/Current`

pub mod bridge;
pub mod config;
pub mod model;
pub mod paths;
pub mod vreg;
