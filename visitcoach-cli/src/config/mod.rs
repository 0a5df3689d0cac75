mod loader;
mod types;

pub use loader::{ConfigLoader, ENDPOINT_ENV};
