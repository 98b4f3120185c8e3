pub mod forecast;
pub mod generator;
pub mod weather;
