pub mod storage;
pub mod upload_service;
pub mod worker;
