//! Infrastructure layer: storage, leader election, external document
//! services, and the publication pipeline that ties them together.

pub mod config;
pub mod document;
pub mod leader;
pub mod publication;
pub mod repository;

#[cfg(test)]
pub(crate) mod testing;
