pub mod gate;

pub use gate::{Attempt, DEFAULT_MAX_OPERAND, DEFAULT_QUESTIONS, MathGate, Question};
