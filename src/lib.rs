//! # gort - Host Reconnaissance Engine
//!
//! gort probes a single host to find which ports accept traffic, labels
//! them with well-known service names and makes a coarse guess at the
//! remote operating system.
//!
//! ## Features
//!
//! - **Scan Strategies**: TCP connect, UDP probe, SYN stealth and OS detection
//! - **Bounded Concurrency**: pool-based strategies keep at most 100 probes in flight
//! - **Raw Pipeline**: one capture handle per scan, replies matched by full tuple
//! - **OS Inference**: open-service voting plus a window/TTL fingerprint
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use gort::scanner::{ScanBuilder, ScanOutcome};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> gort::error::ScanResult<()> {
//!     let outcome = ScanBuilder::new()
//!         .target("192.168.1.1")
//!         .port_range(20, 25)
//!         .timeout(Duration::from_millis(500))
//!         .run()
//!         .await?;
//!
//!     if let ScanOutcome::Ports(results) = outcome {
//!         for result in results {
//!             println!("{}/{}\t{}", result.port, result.status, result.service);
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`types`] - Port and target types
//! - [`scanner`] - Request builder, execution pool and scan strategies
//! - [`raw`] - Raw probe/capture pipeline
//! - [`os`] - OS inference heuristics
//! - [`services`] - Port to service name table
//! - [`config`] - Engine settings
//! - [`error`] - Error types

pub mod cli;
pub mod config;
pub mod error;
pub mod os;
pub mod raw;
pub mod scanner;
pub mod services;
pub mod types;

// Re-export commonly used types
pub use error::{ConfigError, RequestError, ScanError};
pub use scanner::{PortResult, PortStatus, ScanBuilder, ScanOutcome, ScanType, Scanner};
pub use types::{Port, PortSpec, ScanTarget};
