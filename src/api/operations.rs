//! The complete set of GraphQL operations the curator is allowed to send.
//!
//! Each operation pairs its document text with typed variables and a typed
//! response. Query operations also name the family they are cached and
//! invalidated under.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::types::{Article, Disease, DiseaseRef, Qa, QaId, QuestionInput};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Query,
    Mutation,
}

pub trait Operation {
    /// GraphQL `operationName`; also the cache family of a query.
    const NAME: &'static str;
    const KIND: OperationKind;
    const DOCUMENT: &'static str;

    type Variables: Serialize + Send + Sync;
    type Response: DeserializeOwned + Clone + Send;
}

/// Operations with no variables serialize `{}`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NoVariables {}

pub struct DiseaseIds;

#[derive(Debug, Clone, Deserialize)]
pub struct DiseaseIdsData {
    pub diseases: Vec<DiseaseRef>,
}

impl Operation for DiseaseIds {
    const NAME: &'static str = "diseaseIds";
    const KIND: OperationKind = OperationKind::Query;
    const DOCUMENT: &'static str = "query diseaseIds {
  diseases {
    id
  }
}";
    type Variables = NoVariables;
    type Response = DiseaseIdsData;
}

pub struct Diseases;

#[derive(Debug, Clone, Deserialize)]
pub struct DiseasesData {
    pub diseases: Vec<Disease>,
}

impl Operation for Diseases {
    const NAME: &'static str = "diseases";
    const KIND: OperationKind = OperationKind::Query;
    const DOCUMENT: &'static str = "query diseases {
  diseases {
    id
    names
    dbLinks {
      icd10
      icd11
      mesh
    }
    category
    description
  }
}";
    type Variables = NoVariables;
    type Response = DiseasesData;
}

pub struct ArticleById;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleVariables {
    pub article_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArticleData {
    pub article: Option<Article>,
}

impl Operation for ArticleById {
    const NAME: &'static str = "article";
    const KIND: OperationKind = OperationKind::Query;
    const DOCUMENT: &'static str = "query article($articleId: ID!) {
  article(id: $articleId) {
    id
    text
  }
}";
    type Variables = ArticleVariables;
    type Response = ArticleData;
}

pub struct Qas;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QasVariables {
    pub disease_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QasData {
    /// Nullable in the schema; `None` and `[]` both mean no entries.
    pub qas: Option<Vec<Qa>>,
}

impl Operation for Qas {
    const NAME: &'static str = "qas";
    const KIND: OperationKind = OperationKind::Query;
    const DOCUMENT: &'static str = "query qas($diseaseId: ID!) {
  qas(diseaseId: $diseaseId) {
    id
    article {
      id
      text
    }
    questions {
      id
      text
      answers {
        answer_start
        text
      }
    }
  }
}";
    type Variables = QasVariables;
    type Response = QasData;
}

/// `{ qa { id } }` payload shared by create and update.
#[derive(Debug, Clone, Deserialize)]
pub struct QaPayload {
    pub qa: Option<QaIdOnly>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QaIdOnly {
    pub id: QaId,
}

pub struct CreateQa;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQaVariables {
    pub disease_id: String,
    pub article_id: String,
    pub questions: Vec<QuestionInput>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateQaData {
    #[serde(rename = "createQA")]
    pub create_qa: QaPayload,
}

impl Operation for CreateQa {
    const NAME: &'static str = "createQA";
    const KIND: OperationKind = OperationKind::Mutation;
    const DOCUMENT: &'static str = "mutation createQA($diseaseId: String!, $articleId: String!, $questions: [QuestionInput!]!) {
  createQA(input: { diseaseId: $diseaseId, articleId: $articleId, questions: $questions }) {
    qa {
      id
    }
  }
}";
    type Variables = CreateQaVariables;
    type Response = CreateQaData;
}

pub struct UpdateQa;

/// Whole-list replacement of a QA entry's questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateQaVariables {
    pub id: QaId,
    pub questions: Vec<QuestionInput>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateQaData {
    #[serde(rename = "updateQA")]
    pub update_qa: QaPayload,
}

impl Operation for UpdateQa {
    const NAME: &'static str = "updateQA";
    const KIND: OperationKind = OperationKind::Mutation;
    const DOCUMENT: &'static str = "mutation updateQA($id: ID!, $questions: [UpdateQuestionInput!]!) {
  updateQA(input: { qaId: $id, patch: { questions: $questions } }) {
    qa {
      id
    }
  }
}";
    type Variables = UpdateQaVariables;
    type Response = UpdateQaData;
}

pub struct DeleteQa;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteQaVariables {
    pub id: QaId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteQaData {
    #[serde(rename = "deleteQA")]
    pub delete_qa: DeleteQaPayload,
}

/// The server answers with a placeholder `_stub` field; only the presence of
/// the payload matters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeleteQaPayload {}

impl Operation for DeleteQa {
    const NAME: &'static str = "deleteQA";
    const KIND: OperationKind = OperationKind::Mutation;
    const DOCUMENT: &'static str = "mutation deleteQA($id: ID!) {
  deleteQA(input: { id: $id }) {
    _stub
  }
}";
    type Variables = DeleteQaVariables;
    type Response = DeleteQaData;
}

/// Server-side dataset refresh trigger.
pub struct FetchDiseases;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchDiseasesData {
    pub fetch_diseases: bool,
}

impl Operation for FetchDiseases {
    const NAME: &'static str = "fetchDiseases";
    const KIND: OperationKind = OperationKind::Mutation;
    const DOCUMENT: &'static str = "mutation fetchDiseases {
  fetchDiseases
}";
    type Variables = NoVariables;
    type Response = FetchDiseasesData;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::AnswerInput;

    #[test]
    fn test_document_names_match_operation_names() {
        fn check<O: Operation>() {
            let header = O::DOCUMENT.lines().next().unwrap();
            let keyword = match O::KIND {
                OperationKind::Query => "query ",
                OperationKind::Mutation => "mutation ",
            };
            assert!(header.starts_with(&format!("{}{}", keyword, O::NAME)), "{}", header);
        }
        check::<DiseaseIds>();
        check::<Diseases>();
        check::<ArticleById>();
        check::<Qas>();
        check::<CreateQa>();
        check::<UpdateQa>();
        check::<DeleteQa>();
        check::<FetchDiseases>();
    }

    #[test]
    fn test_create_variables_wire_shape() {
        let vars = CreateQaVariables {
            disease_id: "H00001".to_string(),
            article_id: "31415".to_string(),
            questions: vec![QuestionInput {
                text: "Risk factor?".to_string(),
                answers: vec![AnswerInput {
                    text: "smoking".to_string(),
                    answer_start: 4,
                }],
            }],
        };
        let json = serde_json::to_value(&vars).unwrap();
        assert_eq!(json["diseaseId"], "H00001");
        assert_eq!(json["articleId"], "31415");
        assert_eq!(json["questions"][0]["answers"][0]["answer_start"], 4);
    }

    #[test]
    fn test_decode_mutation_payloads() {
        let create: CreateQaData =
            serde_json::from_str(r#"{"createQA": {"qa": {"id": "qa-1"}}}"#).unwrap();
        assert_eq!(create.create_qa.qa.unwrap().id, "qa-1");

        let delete: DeleteQaData =
            serde_json::from_str(r#"{"deleteQA": {"_stub": ""}}"#).unwrap();
        assert_eq!(delete.delete_qa, DeleteQaPayload {});
        assert!(serde_json::from_str::<DeleteQaData>(r#"{"deleteQA": null}"#).is_err());

        let refresh: FetchDiseasesData =
            serde_json::from_str(r#"{"fetchDiseases": true}"#).unwrap();
        assert!(refresh.fetch_diseases);

        let qas: QasData = serde_json::from_str(r#"{"qas": null}"#).unwrap();
        assert!(qas.qas.is_none());
    }
}
