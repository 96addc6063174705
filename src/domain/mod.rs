//! Domain layer: the entities of the quote-to-bind flow, the field
//! validator, and the carrier port the application layer talks to.

pub mod customer;
pub mod payment;
pub mod ports;
pub mod records;
pub mod validation;
