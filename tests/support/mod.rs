#![allow(dead_code)]

pub mod pma_mock;
pub mod socket_guard;
