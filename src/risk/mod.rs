pub mod assembler;
pub mod definitions;
pub mod matcher;
pub mod probability;
pub mod types;
