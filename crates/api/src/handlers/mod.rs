pub mod generation;
pub mod health;
pub mod info;
pub mod jobs;
pub mod videos;
