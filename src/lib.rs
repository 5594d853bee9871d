//! # tickervol
//!
//! Ranks trading instruments by price volatility across a directory of trade
//! files, using either a shared-memory worker pool or one worker process per
//! file.
//!
//! ## Usage
//!
//! ```bash
//! tickervol [--mode shared|isolated] [--workers N] [--top N] [trades]
//! ```
//!
//! ## Modules
//!
//! - `metric` - Range-based volatility of a price series
//! - `unit` - Processing of one trade file, plus the isolated worker message
//! - `distributor` - Shared-memory and isolated-process worker pools
//! - `aggregate` - Folding of results and ranking derivation
//! - `report` - Text and JSON rendering
//! - `scan` - Input listing and the end-to-end run
//! - `config` - Layered configuration (TOML, environment, CLI)
//! - `subprocess` - Process runner abstraction with a mock for tests
//! - `timing` - Scoped timers for top-level operations
//! - `error` - Fatal and per-unit error types with error codes
pub mod aggregate;
pub mod config;
pub mod distributor;
pub mod error;
pub mod metric;
pub mod report;
pub mod scan;
pub mod subprocess;
pub mod timing;
pub mod unit;
