pub mod constants;
pub mod dto;
pub mod handler;
pub mod prompt;
pub mod retry;
pub mod service;
pub mod store;
pub mod template;
pub mod worker;

pub use service::ReportGenerator;
pub use store::ReportStore;
pub use worker::ReportQueue;
