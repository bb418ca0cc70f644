//! Chat transcript, the only state a chat front end keeps between turns.

pub const EXAMPLE_QUESTIONS: &[&str] = &[
    "What are the main challenges facing Hong Kong's healthcare system?",
    "How many public hospitals are there in Hong Kong?",
    "What is the Hospital Authority responsible for?",
    "What are the waiting times for specialist outpatient services?",
    "How does the Elderly Health Care Voucher Scheme work?",
    "What primary healthcare services are provided by District Health Centres?",
];

#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Answer { text: String, sources: Vec<String> },
    Error(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub question: String,
    pub reply: Reply,
}

#[derive(Debug, Default)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self { Self::default() }

    pub fn record_answer(&mut self, question: &str, text: &str, sources: Vec<String>) {
        self.turns.push(Turn {
            question: question.to_string(),
            reply: Reply::Answer { text: text.to_string(), sources },
        });
    }

    pub fn record_error(&mut self, question: &str, message: &str) {
        self.turns.push(Turn { question: question.to_string(), reply: Reply::Error(message.to_string()) });
    }

    /// Sources of the most recent successful answer.
    pub fn last_sources(&self) -> Option<&[String]> {
        self.turns.iter().rev().find_map(|t| match &t.reply {
            Reply::Answer { sources, .. } => Some(sources.as_slice()),
            Reply::Error(_) => None,
        })
    }

    pub fn turns(&self) -> &[Turn] { &self.turns }
    pub fn len(&self) -> usize { self.turns.len() }
    pub fn is_empty(&self) -> bool { self.turns.is_empty() }
    pub fn clear(&mut self) { self.turns.clear(); }
}
