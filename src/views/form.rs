//! QA authoring: the editable draft, answer capture from article selections,
//! validation, and the create/update submission it produces.

use crate::api::operations::{CreateQaVariables, UpdateQaVariables};
use crate::api::types::{AnswerInput, Article, DiseaseId, Qa, QaId, QuestionInput};

use super::scope::ViewScope;
use super::Fetch;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DraftError {
    #[error("add at least one question")]
    NoQuestions,

    #[error("question {} has no text", .0 + 1)]
    EmptyQuestionText(usize),

    #[error("question {} has no answers", .0 + 1)]
    NoAnswers(usize),

    #[error("answer {} of question {} has no text", .answer + 1, .question + 1)]
    EmptyAnswerText { question: usize, answer: usize },

    #[error("article id is empty")]
    EmptyArticleId,

    #[error("the article of an existing QA entry cannot be changed")]
    ArticleLocked,

    #[error("there is no question {}", .0 + 1)]
    NoSuchQuestion(usize),

    #[error("question {} has no answer {}", .question + 1, .answer + 1)]
    NoSuchAnswer { question: usize, answer: usize },

    #[error("a submission is already in flight")]
    SubmitInFlight,
}

/// What the curator highlighted in the article: its literal text and the
/// character offset it starts at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSelection {
    pub text: String,
    pub anchor_offset: usize,
}

impl TextSelection {
    /// Characters `[start, end)` of `text`. Ends beyond the text are cut
    /// short; the anchor offset is kept as given.
    pub fn from_char_range(text: &str, start: usize, end: usize) -> Self {
        let (start, end) = if end < start { (end, start) } else { (start, end) };
        Self {
            text: text.chars().skip(start).take(end - start).collect(),
            anchor_offset: start,
        }
    }

    /// The `occurrence`-th (1-based) match of `phrase` in `text`.
    pub fn find(text: &str, phrase: &str, occurrence: usize) -> Option<Self> {
        if phrase.is_empty() || occurrence == 0 {
            return None;
        }
        let (byte_index, _) = text.match_indices(phrase).nth(occurrence - 1)?;
        Some(Self {
            text: phrase.to_string(),
            anchor_offset: text[..byte_index].chars().count(),
        })
    }
}

/// Mutation a valid draft turns into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Create(CreateQaVariables),
    /// Replaces the entry's whole question list.
    Update(UpdateQaVariables),
}

#[derive(Debug)]
pub struct QaForm {
    disease_id: DiseaseId,
    existing_qa_id: Option<QaId>,
    article_id: String,
    questions: Vec<QuestionInput>,
    armed: Option<usize>,
    article: Fetch<Option<Article>>,
    submitting: bool,
    /// Scope of the article lookup; reset whenever the article id changes.
    pub scope: ViewScope,
}

impl QaForm {
    pub fn create(disease_id: &str) -> Self {
        Self {
            disease_id: disease_id.to_string(),
            existing_qa_id: None,
            article_id: String::new(),
            questions: Vec::new(),
            armed: None,
            article: Fetch::Idle,
            submitting: false,
            scope: ViewScope::default(),
        }
    }

    /// Pre-filled from an existing entry. Question ids are dropped: the update
    /// replaces the list wholesale.
    pub fn edit(disease_id: &str, qa: &Qa) -> Self {
        let mut form = Self::create(disease_id);
        form.existing_qa_id = Some(qa.id.clone());
        form.article_id = qa.article.id.clone();
        form.questions = qa.questions.iter().map(QuestionInput::from).collect();
        form.article = Fetch::Loaded(Some(qa.article.clone()));
        form
    }

    pub fn disease_id(&self) -> &str {
        &self.disease_id
    }

    pub fn existing_qa_id(&self) -> Option<&str> {
        self.existing_qa_id.as_deref()
    }

    pub fn is_editing(&self) -> bool {
        self.existing_qa_id.is_some()
    }

    pub fn article_id(&self) -> &str {
        &self.article_id
    }

    pub fn questions(&self) -> &[QuestionInput] {
        &self.questions
    }

    pub fn armed(&self) -> Option<usize> {
        self.armed
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn article(&self) -> &Fetch<Option<Article>> {
        &self.article
    }

    /// Text answers are marked in, once the article lookup has produced one.
    pub fn article_text(&self) -> Option<&str> {
        match &self.article {
            Fetch::Loaded(Some(article)) if !article.text.is_empty() => Some(article.text.as_str()),
            _ => None,
        }
    }

    pub fn set_article_id(&mut self, article_id: &str) -> Result<(), DraftError> {
        if self.is_editing() {
            return Err(DraftError::ArticleLocked);
        }
        self.article_id = article_id.trim().to_string();
        self.article = Fetch::Idle;
        self.scope.reset();
        Ok(())
    }

    /// Drop an in-flight article lookup; the draft itself is untouched.
    pub fn abandon_requests(&mut self) {
        if self.article == Fetch::Loading {
            self.article = Fetch::Idle;
        }
        self.scope.reset();
    }

    pub fn mark_article_loading(&mut self) {
        self.article = Fetch::Loading;
    }

    /// Result of the article lookup. Unknown ids and lookup failures both
    /// leave the form without text.
    pub fn set_article(&mut self, article: Fetch<Option<Article>>) {
        self.article = article;
    }

    pub fn add_question(&mut self) -> usize {
        self.questions.push(QuestionInput::default());
        self.questions.len() - 1
    }

    pub fn set_question_text(&mut self, index: usize, text: &str) -> Result<(), DraftError> {
        let question = self
            .questions
            .get_mut(index)
            .ok_or(DraftError::NoSuchQuestion(index))?;
        question.text = text.to_string();
        Ok(())
    }

    pub fn remove_question(&mut self, index: usize) -> Result<QuestionInput, DraftError> {
        if index >= self.questions.len() {
            return Err(DraftError::NoSuchQuestion(index));
        }
        // Keep the armed marker on the same question.
        self.armed = match self.armed {
            Some(armed) if armed == index => None,
            Some(armed) if armed > index => Some(armed - 1),
            other => other,
        };
        Ok(self.questions.remove(index))
    }

    pub fn remove_answer(&mut self, question: usize, answer: usize) -> Result<AnswerInput, DraftError> {
        let q = self
            .questions
            .get_mut(question)
            .ok_or(DraftError::NoSuchQuestion(question))?;
        if answer >= q.answers.len() {
            return Err(DraftError::NoSuchAnswer { question, answer });
        }
        Ok(q.answers.remove(answer))
    }

    /// Arm a question: the next selection becomes one of its answers.
    pub fn arm(&mut self, index: usize) -> Result<(), DraftError> {
        if index >= self.questions.len() {
            return Err(DraftError::NoSuchQuestion(index));
        }
        self.armed = Some(index);
        Ok(())
    }

    pub fn disarm(&mut self) {
        self.armed = None;
    }

    /// Turn a selection into an answer of the armed question and disarm.
    /// Without an armed question the selection is ignored. Returns the
    /// (question, answer) position of the new answer.
    pub fn capture_selection(&mut self, selection: &TextSelection) -> Option<(usize, usize)> {
        let index = self.armed.take()?;
        let question = self.questions.get_mut(index)?;
        question.answers.push(AnswerInput {
            text: selection.text.clone(),
            answer_start: selection.anchor_offset as i64,
        });
        Some((index, question.answers.len() - 1))
    }

    pub fn validate(&self) -> Result<(), DraftError> {
        if self.questions.is_empty() {
            return Err(DraftError::NoQuestions);
        }
        for (qi, question) in self.questions.iter().enumerate() {
            if question.text.is_empty() {
                return Err(DraftError::EmptyQuestionText(qi));
            }
            if question.answers.is_empty() {
                return Err(DraftError::NoAnswers(qi));
            }
            if let Some(ai) = question.answers.iter().position(|a| a.text.is_empty()) {
                return Err(DraftError::EmptyAnswerText {
                    question: qi,
                    answer: ai,
                });
            }
        }
        if self.article_id.is_empty() {
            return Err(DraftError::EmptyArticleId);
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Validate and produce the mutation to send. Refused while a previous
    /// submission is still in flight; the guard is advisory.
    pub fn begin_submit(&mut self) -> Result<Submission, DraftError> {
        if self.submitting {
            return Err(DraftError::SubmitInFlight);
        }
        self.validate()?;
        self.submitting = true;

        let questions = self.questions.clone();
        Ok(match &self.existing_qa_id {
            Some(id) => Submission::Update(UpdateQaVariables {
                id: id.clone(),
                questions,
            }),
            None => Submission::Create(CreateQaVariables {
                disease_id: self.disease_id.clone(),
                article_id: self.article_id.clone(),
                questions,
            }),
        })
    }

    pub fn finish_submit(&mut self) {
        self.submitting = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::{Answer, Question};

    const ARTICLE: &str = "Patients reported pain after long exposure.";

    fn form_with_article() -> QaForm {
        let mut form = QaForm::create("H00001");
        form.set_article_id("art-1").unwrap();
        form.set_article(Fetch::Loaded(Some(Article {
            id: "art-1".to_string(),
            text: ARTICLE.to_string(),
        })));
        form
    }

    fn valid_form() -> QaForm {
        let mut form = form_with_article();
        form.add_question();
        form.set_question_text(0, "What did patients report?").unwrap();
        form.arm(0).unwrap();
        form.capture_selection(&TextSelection::from_char_range(ARTICLE, 18, 22));
        form
    }

    #[test]
    fn test_selection_from_char_range() {
        let sel = TextSelection::from_char_range("0123456789 pain here", 11, 15);
        assert_eq!(sel.text, "pain");
        assert_eq!(sel.anchor_offset, 11);

        let reversed = TextSelection::from_char_range("abcdef", 4, 1);
        assert_eq!(reversed.text, "bcd");
        assert_eq!(reversed.anchor_offset, 1);

        let past_end = TextSelection::from_char_range("abc", 2, 10);
        assert_eq!(past_end.text, "c");
    }

    #[test]
    fn test_selection_find_uses_char_offsets() {
        let text = "ééé pain, more pain";
        let first = TextSelection::find(text, "pain", 1).unwrap();
        assert_eq!(first.anchor_offset, 4);
        let second = TextSelection::find(text, "pain", 2).unwrap();
        assert_eq!(second.anchor_offset, 15);
        assert!(TextSelection::find(text, "pain", 3).is_none());
        assert!(TextSelection::find(text, "", 1).is_none());
    }

    #[test]
    fn test_selection_without_arming_adds_nothing() {
        let mut form = form_with_article();
        form.add_question();
        let sel = TextSelection::from_char_range(ARTICLE, 18, 22);
        assert_eq!(form.capture_selection(&sel), None);
        assert!(form.questions()[0].answers.is_empty());
    }

    #[test]
    fn test_armed_capture_appends_and_disarms() {
        let text = "0123456789pain and more";
        let mut form = QaForm::create("H1");
        form.add_question();
        form.add_question();
        form.arm(1).unwrap();
        let sel = TextSelection::from_char_range(text, 10, 14);
        assert_eq!(form.capture_selection(&sel), Some((1, 0)));
        assert_eq!(
            form.questions()[1].answers,
            vec![AnswerInput {
                text: "pain".to_string(),
                answer_start: 10
            }]
        );
        assert_eq!(form.armed(), None);
        assert_eq!(form.capture_selection(&sel), None);
    }

    #[test]
    fn test_validation_rules() {
        let mut form = form_with_article();
        assert_eq!(form.validate(), Err(DraftError::NoQuestions));

        form.add_question();
        assert_eq!(form.validate(), Err(DraftError::EmptyQuestionText(0)));

        form.set_question_text(0, "Q?").unwrap();
        assert_eq!(form.validate(), Err(DraftError::NoAnswers(0)));

        form.arm(0).unwrap();
        form.capture_selection(&TextSelection::from_char_range(ARTICLE, 3, 3));
        assert_eq!(
            form.validate(),
            Err(DraftError::EmptyAnswerText { question: 0, answer: 0 })
        );

        form.remove_answer(0, 0).unwrap();
        form.arm(0).unwrap();
        form.capture_selection(&TextSelection::from_char_range(ARTICLE, 18, 22));
        assert!(form.is_valid());

        form.set_article_id("").unwrap();
        assert_eq!(form.validate(), Err(DraftError::EmptyArticleId));
    }

    #[test]
    fn test_create_submission_carries_draft() {
        let mut form = valid_form();
        let submission = form.begin_submit().unwrap();
        assert_eq!(
            submission,
            Submission::Create(CreateQaVariables {
                disease_id: "H00001".to_string(),
                article_id: "art-1".to_string(),
                questions: vec![QuestionInput {
                    text: "What did patients report?".to_string(),
                    answers: vec![AnswerInput {
                        text: "pain".to_string(),
                        answer_start: 18
                    }],
                }],
            })
        );
        assert_eq!(form.begin_submit(), Err(DraftError::SubmitInFlight));
        form.finish_submit();
        assert!(form.begin_submit().is_ok());
    }

    #[test]
    fn test_invalid_submit_leaves_form_idle() {
        let mut form = form_with_article();
        assert_eq!(form.begin_submit(), Err(DraftError::NoQuestions));
        assert!(!form.is_submitting());
    }

    #[test]
    fn test_edit_locks_article_and_updates_whole_list() {
        let qa = Qa {
            id: "qa-9".to_string(),
            disease: None,
            article: Article {
                id: "art-7".to_string(),
                text: ARTICLE.to_string(),
            },
            questions: vec![Question {
                id: "q-1".to_string(),
                text: "Old?".to_string(),
                answers: vec![Answer {
                    text: "pain".to_string(),
                    answer_start: 18,
                }],
            }],
        };
        let mut form = QaForm::edit("H00001", &qa);
        assert_eq!(form.article_text(), Some(ARTICLE));
        assert_eq!(form.set_article_id("other"), Err(DraftError::ArticleLocked));
        assert_eq!(form.article_id(), "art-7");

        form.set_question_text(0, "New?").unwrap();
        match form.begin_submit().unwrap() {
            Submission::Update(vars) => {
                assert_eq!(vars.id, "qa-9");
                assert_eq!(vars.questions.len(), 1);
                assert_eq!(vars.questions[0].text, "New?");
            }
            other => panic!("expected update, got {:?}", other),
        }
    }

    #[test]
    fn test_remove_question_shifts_armed_marker() {
        let mut form = QaForm::create("H1");
        for _ in 0..3 {
            form.add_question();
        }
        form.arm(2).unwrap();
        form.remove_question(0).unwrap();
        assert_eq!(form.armed(), Some(1));
        form.remove_question(1).unwrap();
        assert_eq!(form.armed(), None);
        assert_eq!(form.remove_question(5), Err(DraftError::NoSuchQuestion(5)));
    }

    #[test]
    fn test_error_messages_are_one_based() {
        assert_eq!(DraftError::NoAnswers(0).to_string(), "question 1 has no answers");
        assert_eq!(
            DraftError::NoSuchAnswer { question: 1, answer: 2 }.to_string(),
            "question 2 has no answer 3"
        );
    }

    #[test]
    fn test_abandon_requests_keeps_draft() {
        let mut form = QaForm::create("H1");
        form.set_article_id("a").unwrap();
        form.add_question();
        form.mark_article_loading();
        let ticket = form.scope.ticket();

        form.abandon_requests();
        assert!(!form.scope.is_current(ticket));
        assert_eq!(form.article(), &Fetch::Idle);
        assert_eq!(form.article_id(), "a");
        assert_eq!(form.questions().len(), 1);
    }
}
