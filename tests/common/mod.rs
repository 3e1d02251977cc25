#![allow(dead_code)]

pub mod harness;
pub mod http_client;
pub mod upstream;
