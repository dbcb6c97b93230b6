pub mod flood;
pub mod format;
pub mod roles;
pub mod time;
