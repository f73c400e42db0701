#![cfg_attr(not(test), no_std)]

pub mod device;
pub mod flash;
pub mod geometry;
pub mod mount;
pub mod scsi;
pub mod sense;

#[cfg(feature = "ramflash")]
pub mod ramflash;
