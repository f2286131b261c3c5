pub mod file_service;
pub mod lifecycle;
pub mod record_store;
pub mod storage;
pub mod worker;
