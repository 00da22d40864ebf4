pub mod command;
pub mod gallery;
