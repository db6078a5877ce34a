//! Cinescore collect crate - catalog client and the dated raw dataset writer.
//!
//! Pulls a fixed number of "popular" listing pages from the content catalog,
//! fetches full detail for every listed movie and writes one
//! `movies_{date}.csv` snapshot per run.

pub mod client;
pub mod collector;

pub use client::{CatalogClient, MovieDetail};
pub use collector::{collect, CollectReport};
