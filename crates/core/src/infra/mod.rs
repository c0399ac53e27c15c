pub mod clock;
pub mod gateway;
pub mod metrics;
pub mod storage;
