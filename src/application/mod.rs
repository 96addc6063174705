//! Application layer containing the quote-to-bind orchestration.
//!
//! This module defines `QuoteWorkflow`, the state machine that sequences the
//! field validator and the carrier gateway and owns the session state the
//! presentation layer reads.

pub mod workflow;
