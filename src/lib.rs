//! Filter-and-aggregate pipeline behind the coffee-sales and
//! student-performance dashboards.
//!
//! The desktop front end lives in `main.rs`; everything in this library is
//! independent of rendering so it can be exercised from tests.

pub mod color;
pub mod config;
pub mod data;
pub mod pages;
