pub mod complaints;
pub mod core;
pub mod session;
pub mod students;
