pub mod entity;
pub mod error;
pub mod parse;
pub mod port;
