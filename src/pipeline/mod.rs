pub mod bank;
pub mod effects;
pub mod grid;
pub mod persistence;
pub mod project;
pub mod store;
