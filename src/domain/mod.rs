pub mod address;
pub mod models;
pub mod predicate;
pub mod settings;
