pub mod batch;
pub mod domain;
pub mod error;
pub mod infrastructure;
