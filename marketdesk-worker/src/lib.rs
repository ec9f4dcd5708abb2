//! # MarketDesk Worker Library
//!
//! Background maintenance for MarketDesk.
//!
//! ## Modules
//!
//! - `sweeper`: periodic deletion of expired sessions

pub mod sweeper;
