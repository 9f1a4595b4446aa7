pub mod agenda;
pub mod alarm;
pub mod config;
pub mod error;
pub mod event;
pub mod month;
pub mod notify;
pub mod scheduler;
pub mod store;
pub mod view;

pub use error::{Error, ErrorKind, Result};
