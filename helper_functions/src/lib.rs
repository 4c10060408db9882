pub mod misc;
pub mod predicates;
