pub mod availability;
pub mod common;
pub mod event_type;
pub mod meeting;
