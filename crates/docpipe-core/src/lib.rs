#![doc = include_str!("../README.md")]

mod codec;
mod common;
mod extract;
mod queue;

pub use codec::*;
pub use common::*;
pub use extract::*;
pub use queue::*;
