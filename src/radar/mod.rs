pub mod dashboard;
pub mod service;
