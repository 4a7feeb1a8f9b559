//! Core logic: config types, parsing, construct tree, synthesis, planning.

pub mod construct;
pub mod hasher;
pub mod parser;
pub mod planner;
pub mod resolver;
pub mod stack;
pub mod synth;
pub mod types;
