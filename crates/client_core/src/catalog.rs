use shared::domain::StepId;

/// One riddle gating the proposal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub id: StepId,
    pub prompt: String,
    pub accepted_answers: Vec<String>,
    pub hint: String,
}

impl Question {
    pub fn new(
        id: impl Into<String>,
        prompt: impl Into<String>,
        accepted_answers: &[&str],
        hint: impl Into<String>,
    ) -> Self {
        Self {
            id: StepId::new(id),
            prompt: prompt.into(),
            accepted_answers: accepted_answers.iter().map(|a| a.to_string()).collect(),
            hint: hint.into(),
        }
    }
}

/// Ordered, immutable list of questions. Order is the order they are asked in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    questions: Vec<Question>,
}

impl Catalog {
    pub fn new(questions: Vec<Question>) -> Self {
        Self { questions }
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn get(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new(vec![
            Question::new(
                "DESTINATION",
                "Where's destination 1?",
                &[
                    "carillon point kirkland",
                    "carillon point",
                    "kirkland carillon point",
                ],
                "It's a beautiful spot on the water in Kirkland... starts with a 'C'.",
            ),
            Question::new(
                "DINING",
                "Where are we eating?",
                &["moss bay hall", "moss bay"],
                "Think of a 'Hall' located near the 'Bay' in downtown Kirkland...",
            ),
        ])
    }
}
