//! # Locators
//!
//! HTTP clients for the two geolocation services.
//!
//! - [`ProximityLocator`] - estimate from nearby access points (needs an API key)
//! - [`AddressLocator`] - estimate from the caller's public address (no input)
//!
//! Both produce a [`LocationRecord`](geoledger_core::LocationRecord) stamped
//! with the time of the lookup.

pub mod address;
pub mod proximity;

pub use address::AddressLocator;
pub use proximity::ProximityLocator;
