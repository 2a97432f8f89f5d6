pub mod cache;
pub mod events;
pub mod gamma_api;
pub mod trends;
pub mod types;
