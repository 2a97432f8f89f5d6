pub mod history;
pub mod series;
