pub mod catalog;
pub mod config;
pub mod errors;
pub mod meme_utils;
pub mod resolver;
pub mod selector;
pub mod shaping;
pub mod throttle;
