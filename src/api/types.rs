use serde::{Deserialize, Serialize};

/// Server-assigned identifiers. All are GraphQL `ID`s, carried as strings.
pub type DiseaseId = String;
pub type ArticleId = String;
pub type QaId = String;

/// Cross-reference code lists. Each list may be absent on the server side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiseaseDbLinks {
    #[serde(default)]
    pub icd10: Option<Vec<String>>,
    #[serde(default)]
    pub icd11: Option<Vec<String>>,
    #[serde(default)]
    pub mesh: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Disease {
    pub id: DiseaseId,
    pub names: Vec<String>,
    pub category: String,
    pub description: String,
    pub db_links: DiseaseDbLinks,
}

/// Row of the lightweight `diseaseIds` listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiseaseRef {
    pub id: DiseaseId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub id: ArticleId,
    pub text: String,
}

/// An answer span: literal text plus its character offset in the article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub answer_start: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub text: String,
    pub answers: Vec<Answer>,
}

/// A QA entry as returned by the `qas` listing. The listing never selects the
/// disease, so it is optional here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Qa {
    pub id: QaId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disease: Option<DiseaseRef>,
    pub article: Article,
    pub questions: Vec<Question>,
}

/// Answer payload for both `QuestionInput` and `UpdateQuestionInput`; the two
/// schema types have identical shapes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerInput {
    pub text: String,
    pub answer_start: i64,
}

/// A question as sent in create/update mutations. It never carries an id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionInput {
    pub text: String,
    pub answers: Vec<AnswerInput>,
}

impl From<&Answer> for AnswerInput {
    fn from(answer: &Answer) -> Self {
        Self {
            text: answer.text.clone(),
            answer_start: answer.answer_start,
        }
    }
}

impl From<&Question> for QuestionInput {
    fn from(question: &Question) -> Self {
        Self {
            text: question.text.clone(),
            answers: question.answers.iter().map(AnswerInput::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disease_decodes_camel_case_and_missing_links() {
        let json = r#"{
            "id": "H00001",
            "names": ["Influenza", "Flu"],
            "category": "Infectious disease",
            "description": "Viral infection",
            "dbLinks": {"icd10": ["J10", "J11"], "icd11": null}
        }"#;
        let disease: Disease = serde_json::from_str(json).unwrap();
        assert_eq!(disease.db_links.icd10.as_deref(), Some(&["J10".to_string(), "J11".to_string()][..]));
        assert_eq!(disease.db_links.icd11, None);
        assert_eq!(disease.db_links.mesh, None);
    }

    #[test]
    fn test_question_input_drops_ids() {
        let question = Question {
            id: "q1".to_string(),
            text: "What causes it?".to_string(),
            answers: vec![Answer {
                text: "a virus".to_string(),
                answer_start: 12,
            }],
        };
        let input = QuestionInput::from(&question);
        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "text": "What causes it?",
                "answers": [{"text": "a virus", "answer_start": 12}]
            })
        );
    }
}
