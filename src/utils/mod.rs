pub mod session_cache;
pub mod working_days;
