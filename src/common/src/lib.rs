pub mod constants;
pub mod event;
