#![no_std]

extern crate alloc;

pub mod constants;
pub mod cpu;
pub mod memory;
pub mod utils;
