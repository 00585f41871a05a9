use log::debug;
use rand::Rng;

pub const DEFAULT_QUESTIONS: usize = 4;
pub const DEFAULT_MAX_OPERAND: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Question {
    pub left: u32,
    pub right: u32,
}

impl Question {
    pub fn answer(&self) -> u32 {
        self.left + self.right
    }
}

impl std::fmt::Display for Question {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} + {} = ?", self.left, self.right)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    /// Right answer, the next question is up.
    Correct,
    /// Wrong answer, same question again.
    Wrong,
    /// Not a number.
    Invalid,
    /// Right answer to the last question. The alarm may stop.
    Solved,
}

/// Arithmetic questions that all have to be answered before an alarm can be
/// dismissed.
#[derive(Debug, Clone)]
pub struct MathGate {
    questions: Vec<Question>,
    current: usize,
    wrong_answers: u32,
}

impl MathGate {
    /// `count` addition questions with operands in `1..=max_operand`, the
    /// larger operand first.
    pub fn generate<R: Rng>(rng: &mut R, count: usize, max_operand: u32) -> Self {
        let max_operand = max_operand.max(1);
        let questions = (0..count.max(1))
            .map(|_| {
                let a = rng.gen_range(1..=max_operand);
                let b = rng.gen_range(1..=max_operand);
                Question {
                    left: a.max(b),
                    right: a.min(b),
                }
            })
            .collect();
        Self::from_questions(questions)
    }

    pub fn from_questions(questions: Vec<Question>) -> Self {
        Self {
            questions,
            current: 0,
            wrong_answers: 0,
        }
    }

    pub fn current(&self) -> Option<&Question> {
        self.questions.get(self.current)
    }

    /// 1-based number of the question being asked, and the total.
    pub fn position(&self) -> (usize, usize) {
        ((self.current + 1).min(self.questions.len()), self.questions.len())
    }

    pub fn is_solved(&self) -> bool {
        self.current >= self.questions.len()
    }

    pub fn wrong_answers(&self) -> u32 {
        self.wrong_answers
    }

    pub fn answer(&mut self, input: &str) -> Attempt {
        let Some(question) = self.current().copied() else {
            return Attempt::Solved;
        };
        let Ok(value) = input.trim().parse::<u32>() else {
            return Attempt::Invalid;
        };

        if value != question.answer() {
            self.wrong_answers += 1;
            debug!("wrong answer {} to {}", value, question);
            return Attempt::Wrong;
        }

        self.current += 1;
        if self.is_solved() {
            debug!("gate solved with {} wrong answers", self.wrong_answers);
            Attempt::Solved
        } else {
            Attempt::Correct
        }
    }
}
