pub mod account;
pub mod auth;
pub mod bulk;
pub mod orders;
pub mod stream;
pub mod v1;
