// only use std when feature = "std" is enabled or during testing
#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![allow(async_fn_in_trait)]

mod fmt;

pub mod avionics;
pub mod common;
pub mod driver;

pub use avionics::avionics_main;
pub use driver::clock::Clock;
