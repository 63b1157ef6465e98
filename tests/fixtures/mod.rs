pub mod repository;
pub mod studies;
