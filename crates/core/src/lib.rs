#![deny(warnings)]

pub mod capability;
pub mod config;
pub mod host;
pub mod recognize;
pub mod service;
pub mod session;
pub mod util;

pub use service::{TranslationError, TranslationService};
