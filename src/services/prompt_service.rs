use serde::{Deserialize, Serialize};

use crate::models::question::QuestionContext;

pub const SHORT_EXPLANATION_MAX_WORDS: usize = 30;

const ROLE: &str = "You are an experienced TOEIC teacher explaining an answer to a student.";

/// The kinds of TOEIC part an explanation can be tailored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartKind {
    Photographs,
    QuestionResponse,
    Conversation,
    Talk,
    IncompleteSentence,
    TextCompletion,
    ReadingComprehension,
    Unknown,
}

/// Static description of how to ask for an explanation of one part kind.
#[derive(Debug)]
pub struct PromptTemplate {
    pub title: &'static str,
    pub objective: &'static str,
    pub focus: &'static str,
    /// Parts 1 and 2 print no question text; the audio carries it.
    pub shows_question_text: bool,
}

const PHOTOGRAPHS: PromptTemplate = PromptTemplate {
    title: "Part 1 - Photographs",
    objective: "The student looked at a photograph and heard four statements, choosing the one that best describes the picture.",
    focus: "Explain what in the picture makes the correct statement true and why each other statement does not match what is shown.",
    shows_question_text: false,
};

const QUESTION_RESPONSE: PromptTemplate = PromptTemplate {
    title: "Part 2 - Question-Response",
    objective: "The student heard a question or statement followed by three responses, choosing the most appropriate response.",
    focus: "Explain why the correct response fits the question, and point out sound-alike words or topic traps in the wrong responses.",
    shows_question_text: false,
};

const CONVERSATION: PromptTemplate = PromptTemplate {
    title: "Part 3 - Conversations",
    objective: "The student listened to a conversation between two or more people and answered a comprehension question about it.",
    focus: "Quote the part of the conversation that gives the answer and explain any paraphrase between the transcript and the correct option.",
    shows_question_text: true,
};

const TALK: PromptTemplate = PromptTemplate {
    title: "Part 4 - Talks",
    objective: "The student listened to a short talk by a single speaker and answered a comprehension question about it.",
    focus: "Quote the sentence of the talk that gives the answer and explain why the other options are not supported.",
    shows_question_text: true,
};

const INCOMPLETE_SENTENCE: PromptTemplate = PromptTemplate {
    title: "Part 5 - Incomplete Sentences",
    objective: "The student chose the word or phrase that best completes a sentence.",
    focus: "Identify the grammar point or vocabulary meaning being tested and explain why each wrong option does not fit the blank.",
    shows_question_text: true,
};

const TEXT_COMPLETION: PromptTemplate = PromptTemplate {
    title: "Part 6 - Text Completion",
    objective: "The student filled a blank in a short text with a word, phrase or sentence.",
    focus: "Use the surrounding sentences of the passage to explain why the correct option fits both grammatically and in context.",
    shows_question_text: true,
};

const READING_COMPREHENSION: PromptTemplate = PromptTemplate {
    title: "Part 7 - Reading Comprehension",
    objective: "The student read one or more passages and answered a question about them.",
    focus: "Point to the lines of the passage that support the correct answer and explain why the other options are wrong or not mentioned.",
    shows_question_text: true,
};

const GENERIC: PromptTemplate = PromptTemplate {
    title: "Multiple-choice question",
    objective: "The student answered a multiple-choice question.",
    focus: "Explain why the correct answer is right and why the other options are wrong.",
    shows_question_text: true,
};

impl PartKind {
    pub fn from_part_number(part_number: u8) -> Self {
        match part_number {
            1 => PartKind::Photographs,
            2 => PartKind::QuestionResponse,
            3 => PartKind::Conversation,
            4 => PartKind::Talk,
            5 => PartKind::IncompleteSentence,
            6 => PartKind::TextCompletion,
            7 => PartKind::ReadingComprehension,
            _ => PartKind::Unknown,
        }
    }

    pub fn template(self) -> &'static PromptTemplate {
        match self {
            PartKind::Photographs => &PHOTOGRAPHS,
            PartKind::QuestionResponse => &QUESTION_RESPONSE,
            PartKind::Conversation => &CONVERSATION,
            PartKind::Talk => &TALK,
            PartKind::IncompleteSentence => &INCOMPLETE_SENTENCE,
            PartKind::TextCompletion => &TEXT_COMPLETION,
            PartKind::ReadingComprehension => &READING_COMPREHENSION,
            PartKind::Unknown => &GENERIC,
        }
    }
}

pub fn output_format_instruction() -> String {
    format!(
        "Respond with a JSON object only, with no text before or after it, in exactly this shape: \
         {{\"short\": \"...\", \"full\": \"...\"}}. \
         \"short\" is a plain-text explanation of at most {} words. \
         \"full\" is the complete explanation and may use the simple HTML tags <b>, <i> and <br>.",
        SHORT_EXPLANATION_MAX_WORDS
    )
}

/// Builds the explanation request for one question. Deterministic for a
/// given context.
pub fn build_prompt(ctx: &QuestionContext) -> String {
    let template = PartKind::from_part_number(ctx.part_number).template();
    let question = &ctx.question;

    let mut prompt = format!("{}\n{}: {}\n\n", ROLE, template.title, template.objective);

    if let Some(passage) = non_blank(ctx.passage.as_deref()) {
        prompt.push_str(&format!("Passage:\n{}\n\n", passage));
    }
    if let Some(transcript) = non_blank(ctx.transcript.as_deref()) {
        prompt.push_str(&format!("Transcript:\n{}\n\n", transcript));
    }
    if template.shows_question_text {
        if let Some(content) = non_blank(Some(&question.content)) {
            prompt.push_str(&format!("Question {}: {}\n", question.number, content));
        }
    } else {
        prompt.push_str(&format!("Question {}\n", question.number));
    }

    prompt.push_str("Answer options:\n");
    for answer in &question.answers {
        prompt.push_str(&format!("({}) {}\n", answer.label, answer.content));
    }
    let correct = match question.answer(&question.correct_answer) {
        Some(answer) => format!("({}) {}", answer.label, answer.content),
        None => format!("({})", question.correct_answer),
    };
    prompt.push_str(&format!("Correct answer: {}\n\n", correct));

    prompt.push_str(template.focus);
    prompt.push('\n');
    prompt.push_str(&output_format_instruction());
    prompt
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test::fixtures::question;

    fn context(part_number: u8) -> QuestionContext {
        let mut q = question(1, 42, "B");
        q.content = "What does the man offer to do?".into();
        QuestionContext {
            question: q,
            part_number,
            transcript: None,
            passage: None,
        }
    }

    #[test]
    fn every_part_number_maps_to_its_kind() {
        let kinds: Vec<PartKind> = (1..=7).map(PartKind::from_part_number).collect();
        assert_eq!(
            kinds,
            vec![
                PartKind::Photographs,
                PartKind::QuestionResponse,
                PartKind::Conversation,
                PartKind::Talk,
                PartKind::IncompleteSentence,
                PartKind::TextCompletion,
                PartKind::ReadingComprehension,
            ]
        );
        assert_eq!(PartKind::from_part_number(0), PartKind::Unknown);
        assert_eq!(PartKind::from_part_number(9), PartKind::Unknown);
    }

    #[test]
    fn prompt_lists_answers_and_correct_label() {
        let prompt = build_prompt(&context(3));
        assert!(prompt.contains("Part 3 - Conversations"));
        assert!(prompt.contains("Question 42: What does the man offer to do?"));
        assert!(prompt.contains("(A) Option A"));
        assert!(prompt.contains("(D) Option D"));
        assert!(prompt.contains("Correct answer: (B) Option B\n"));
        assert!(prompt.ends_with(&output_format_instruction()));
    }

    #[test]
    fn audio_only_parts_omit_question_text() {
        let mut ctx = context(2);
        ctx.transcript = Some("Where is the meeting? (A) At noon. (B) In room 4.".into());
        let prompt = build_prompt(&ctx);
        assert!(!prompt.contains("What does the man offer to do?"));
        assert!(prompt.contains("Transcript:\nWhere is the meeting?"));
        assert!(prompt.contains("Question 42\n"));
    }

    #[test]
    fn blank_transcript_is_skipped() {
        let mut ctx = context(4);
        ctx.transcript = Some("   ".into());
        assert!(!build_prompt(&ctx).contains("Transcript:"));
    }

    #[test]
    fn reading_prompt_includes_passage() {
        let mut ctx = context(7);
        ctx.passage = Some("Notice: the lobby will close early.".into());
        let prompt = build_prompt(&ctx);
        assert!(prompt.contains("Part 7 - Reading Comprehension"));
        assert!(prompt.contains("Passage:\nNotice: the lobby will close early."));
    }

    #[test]
    fn unknown_part_uses_generic_template() {
        let prompt = build_prompt(&context(11));
        assert!(prompt.contains("Multiple-choice question"));
        assert!(prompt.contains("Correct answer: (B)"));
        assert!(prompt.ends_with(&output_format_instruction()));
    }

    #[test]
    fn prompt_is_deterministic() {
        let ctx = context(5);
        assert_eq!(build_prompt(&ctx), build_prompt(&ctx));
    }
}
