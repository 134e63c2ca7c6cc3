//! Statement builders.

pub mod delete;
pub mod insert;
pub mod raw;
pub mod select;
pub mod update;
