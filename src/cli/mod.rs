pub mod build;
pub mod doctor;
pub mod search;
