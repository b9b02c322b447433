//! Core types and definitions for Easel diagrams.
//!
//! This crate holds the leaf-level vocabulary of the Easel model: integer
//! geometry, colors, closed kind/style tags, render-ready draw records, and
//! the text-measurement capability. It knows nothing about entities, undo or
//! persistence; those live in the `easel` crate.

pub mod color;
pub mod draw;
pub mod geometry;
pub mod style;
pub mod text;
