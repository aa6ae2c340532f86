pub mod candle;
pub mod config;
