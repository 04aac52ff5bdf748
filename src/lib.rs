#![doc = include_str!("../README.md")]

mod error;

pub mod bits;
pub mod capture;
pub mod family;
pub mod framing;
pub mod manchester;
pub mod offsets;
pub mod satellite;
pub mod spacepacket;
pub mod unpack;

pub use error::{Error, Result};
