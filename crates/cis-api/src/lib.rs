//! HTTP client for the Climate Information System backend.

pub mod auth;
pub mod client;
pub mod error;
pub mod export;
pub mod farmers;
pub mod locations;
pub mod messages;
pub mod refresh;
pub mod request;
pub mod retry;
pub mod transport;
pub mod weather;

pub use auth::{HttpTokenRefresher, LoginRequest, Session, User};
pub use client::{ApiClient, ClientConfig};
pub use error::ApiError;
pub use export::{export_csv, records_to_csv, to_records, Record};
pub use farmers::{Farmer, FarmerUpdate, NewFarmer};
pub use locations::{Location, NewLocation};
pub use messages::{Message, MessageKind, MessageStatus, OutgoingMessage};
pub use request::{ApiRequest, ApiResponse, ListQuery, RequestOptions};
pub use retry::RetryPolicy;
pub use transport::{HttpTransport, Transport};
pub use weather::{ForecastDay, WeatherCondition, WeatherObservation};
