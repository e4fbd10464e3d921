//! Workflow Bounded Context
//!
//! Routing of a finished run to its next workflow step.

pub mod gate;

pub use gate::{Gate, GateDecision, GateReason, NextStep, ReasonSource, decide_gate};
