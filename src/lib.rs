pub mod atom;
pub mod condition;
pub mod config;
pub mod diag;
pub mod latch;
pub mod merge;
pub mod uid;
