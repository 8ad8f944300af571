pub mod backend;
pub mod login;
