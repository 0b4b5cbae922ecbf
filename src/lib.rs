//! fieldgate - attribute filtering and validation before persistence
//!
//! A host persistence layer calls [`policy::Guard::before_write`] right
//! before it writes a record. The guard decides which attributes may be
//! written for the operation or named scenario, validates what survives, and
//! either prunes the attribute set or rejects the write with every problem
//! listed in order.

pub mod cli;
pub mod policy;
pub mod rules;
