#![allow(dead_code)]

pub mod fixtures;
pub mod uploaders;

pub use fixtures::*;
pub use uploaders::*;
