#![allow(dead_code)]

pub mod builders;
pub mod scripted;
pub mod strategies;

pub use builders::*;
pub use scripted::*;
