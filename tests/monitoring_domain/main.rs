//! Monitoring Domain Test Suite
//!
//! Exercises keyrecord the way a monitoring/alerting system uses it:
//! services with a status flag, contacts that own checks and media, and a
//! notification queue drained by a delivery worker.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --test monitoring_domain
//! ```

mod test_utils;

mod contacts;
mod delivery;
mod end_to_end;
