//! quadify - Turn messy triangle meshes into clean quad-dominant meshes
//!
//! The [`pipeline`] module orchestrates a fixed sequence of remeshing steps
//! over a host [`scene`]; the [`engine`] module supplies the geometry
//! operations behind the [`engine::MeshEngine`] trait.

pub mod config;
pub mod engine;
pub mod geometry;
pub mod mesh;
pub mod pipeline;
pub mod scene;
