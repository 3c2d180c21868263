//! Core register logic for Custodia.
//!
//! This crate contains the controlled-substance register with ZERO web or
//! database dependencies. Domain types, validation rules, balance rules and
//! authorization checks live here, together with the persistence ports the
//! db crate implements.
//!
//! # Modules
//!
//! - `register` - Entries, balance engine, authorization, service
//! - `memory` - In-process stores implementing the persistence ports

pub mod memory;
pub mod register;
