pub mod client;
pub mod config;
pub mod error;
pub mod extract;
pub mod form;
pub mod portal_data;
pub mod presentation;
pub mod requests;
pub mod scheduler;
pub mod scraping_context;
pub mod session;
mod text_manipulators;

#[cfg(test)]
mod testing;

pub use client::{InfoPointClient, validate_credentials};
pub use config::Credentials;
pub use error::{PortalError, SetupError};
pub use portal_data::{Absences, FetchResult, GradeEntry};
