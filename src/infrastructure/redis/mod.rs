pub mod client;
pub mod counter;
