//! Batch CSV surface used by the command-line driver.

pub mod application_reader;
pub mod outcome_writer;
