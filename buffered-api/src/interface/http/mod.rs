pub mod logs_handler;
pub mod problem;
