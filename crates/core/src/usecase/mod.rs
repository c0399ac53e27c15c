pub mod job_state;
pub mod localization_service;
pub mod poller;
