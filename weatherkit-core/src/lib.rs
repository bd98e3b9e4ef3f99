//! Core library for the WeatherKit dashboard helper.
//!
//! This crate defines:
//! - The request payload sent by the dashboard front-end
//! - ES256 developer token signing and WeatherKit URL building
//! - The WeatherKit provider and the request/notification handler
//! - On-disk configuration for the `weatherkit` CLI

pub mod config;
pub mod endpoint;
pub mod error;
pub mod handler;
pub mod model;
pub mod provider;
pub mod token;

pub use config::{Config, Credentials, Location};
pub use endpoint::Endpoint;
pub use error::{ErrorKind, WeatherKitError};
pub use handler::{Envelope, WeatherKitHelper, handle_request};
pub use model::{Coordinate, WeatherKitRequest, WeatherReport};
pub use provider::{AppleWeatherKit, WeatherProvider};
