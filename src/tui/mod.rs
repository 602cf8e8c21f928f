pub mod app;
pub mod event;
pub mod message;
pub mod mount_task;
pub mod ui;
