//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::catalog::{CatalogIssue, CatalogSummary};
use crate::domain::Skill;
use crate::qgen::GenerationOutput;

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    Generate(GenerateIn),
    GenerateBatch(BatchIn),
    Catalog,
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Generated { output: GenerationOutput },
    GeneratedBatch { outputs: Vec<GenerationOutput> },
    Catalog { catalog: CatalogOut },
    Error { message: String },
}

//
// HTTP request/response DTOs
//

/// Generation request as sent by clients. `level`/`subject` fall back to the
/// engine defaults from config.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateIn {
    pub target_skills: Vec<Skill>,
    pub number_of_questions: usize,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct BatchIn {
    #[serde(flatten)]
    pub request: GenerateIn,
    pub sets: usize,
}

/// `?skills=a,b,c&category=comercio&cognitiveLevel=aplicar`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupQuery {
    pub skills: Option<String>,
    pub category: Option<String>,
    pub cognitive_level: Option<String>,
}

/// `?context=id&skills=a,b&goal=g`
#[derive(Debug, Default, Deserialize)]
pub struct TemplatesQuery {
    pub context: Option<String>,
    pub skills: Option<String>,
    pub goal: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CatalogOut {
    #[serde(flatten)]
    pub summary: CatalogSummary,
    pub issues: Vec<CatalogIssue>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalsOut {
    pub goal_ids: Vec<String>,
}

#[derive(Serialize)]
pub struct ErrorOut {
    pub error: String,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ws_generate_message_parses() {
        let raw = r#"{"type":"generate","targetSkills":["a","b"],"numberOfQuestions":2,"seed":7}"#;
        match serde_json::from_str::<ClientWsMessage>(raw).expect("parse") {
            ClientWsMessage::Generate(g) => {
                assert_eq!(g.target_skills, vec!["a".to_string(), "b".to_string()]);
                assert_eq!(g.number_of_questions, 2);
                assert_eq!(g.seed, Some(7));
                assert!(g.level.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn batch_body_is_flat() {
        let raw = r#"{"targetSkills":["a"],"numberOfQuestions":1,"sets":3}"#;
        let b: BatchIn = serde_json::from_str(raw).expect("parse");
        assert_eq!(b.sets, 3);
        assert_eq!(b.request.target_skills.len(), 1);
    }

    #[test]
    fn server_messages_are_tagged() {
        let s = serde_json::to_string(&ServerWsMessage::Pong).expect("json");
        assert_eq!(s, r#"{"type":"pong"}"#);
        let e = serde_json::to_value(ServerWsMessage::Error { message: "x".into() }).expect("json");
        assert_eq!(e["type"], "error");
    }
}
