pub mod error;
pub mod job;
pub mod progression;
pub mod settings;
pub mod types;
