//! Rule-based interpretation tiers. Both are pure functions of their input.

pub mod basic;
pub mod detailed;

pub use basic::{basic_interpretation, BasicInterpretation};
pub use detailed::{detailed_analysis, Advice, DetailedAnalysis};
