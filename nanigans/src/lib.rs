//! Nanigans destination: forwards normalized customer events to the Nanigans
//! marketing API as HTTP GETs, mapping purchase, product-view, cart and
//! generic user events onto its fixed query-parameter schema.

pub mod client;
pub mod config;
pub mod destination;
pub mod error;
pub mod hash;
pub mod params;
pub mod template;

pub use client::{DeliveryResponse, Endpoint};
pub use config::Settings;
pub use destination::NanigansDestination;
pub use error::{ConfigError, DeliveryError};
