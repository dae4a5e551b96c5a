pub mod sample_loader;
pub mod worker;
