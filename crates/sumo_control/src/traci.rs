//! Client for the TraCI control protocol.
//!
//! TraCI is the TCP protocol a running SUMO engine exposes on its control
//! port. The codec lives in [`protocol`] and is kept free of socket concerns
//! so frames can be asserted byte-for-byte in tests; [`client`] drives a
//! `TcpStream` with it and exposes only the handful of commands the relay
//! needs.

pub mod client;
pub mod protocol;

pub use client::TraciClient;
