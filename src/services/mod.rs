//! Service layer for external collaborators
//!
//! Currently only geolocation: mapping a client address to a country.
//! The lookup result is untrusted input, only its format is validated.

pub mod geoip;

pub use geoip::{CountryLookup, GeoLocation, ProviderChain};
