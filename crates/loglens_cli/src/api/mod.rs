mod client;
mod endpoints;
mod types;

pub use client::ApiClient;
pub use types::{Dataset, Organization, User};
