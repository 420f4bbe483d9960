pub mod api;
pub mod auth;
pub mod client;

pub use auth::authorize_url;
pub use client::TraktClient;
