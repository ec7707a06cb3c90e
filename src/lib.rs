pub mod app;
pub mod seeds;
