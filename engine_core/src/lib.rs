#![forbid(unsafe_code)]

pub mod logging;
