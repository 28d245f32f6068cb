pub mod connection;
pub mod interceptor;
pub mod quiz;
pub mod share;
