//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::domain::{ChallengeContent, ChallengeRef, ChallengeType, RemoteChallenge, TestCase, WorldType};
use crate::tracker::{PerformanceEntry, ProgressSnapshot, SessionData, WorldPerformance};

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    NewChallenge {
        #[serde(rename = "worldType")]
        world: WorldType,
        name: String,
        #[serde(default)]
        difficulty: Option<u8>,
    },
    DynamicChallenge {
        #[serde(rename = "worldType")]
        world: WorldType,
        difficulty: u8,
        #[serde(default, rename = "forceRefresh")]
        force_refresh: bool,
    },
    StartChallenge {
        #[serde(rename = "worldType")]
        world: WorldType,
        name: String,
        difficulty: u8,
    },
    SubmitSolution {
        #[serde(rename = "worldType")]
        world: WorldType,
        name: String,
        solution: String,
    },
    SubmitDynamicAnswer {
        #[serde(rename = "worldType")]
        world: WorldType,
        difficulty: u8,
        answer: String,
    },
    Hint {
        #[serde(rename = "worldType")]
        world: WorldType,
        name: String,
        #[serde(default)]
        difficulty: Option<u8>,
    },
    CompleteChallenge {
        success: bool,
    },
    Progress,
    WorldPerformance {
        #[serde(rename = "worldType")]
        world: WorldType,
    },
    Report,
    Analysis,
    Recommendation {
        #[serde(rename = "worldType")]
        world: WorldType,
    },
    ClearSession,
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Challenge {
        challenge: ChallengeOut,
    },
    DynamicChallenge {
        challenge: DynamicChallengeOut,
    },
    Started {
        name: String,
    },
    SolutionResult {
        correct: bool,
        feedback: String,
    },
    Hint {
        text: String,
    },
    Completed {
        entry: Option<PerformanceEntry>,
        session: SessionData,
    },
    Progress {
        progress: Option<ProgressSnapshot>,
    },
    WorldPerformance {
        performance: Option<WorldPerformance>,
    },
    Report {
        report: String,
    },
    Analysis {
        text: String,
    },
    Recommendation {
        text: String,
    },
    SessionCleared,
    Error {
        message: String,
    },
}

/// DTO used by both WS and HTTP for static challenge delivery.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeOut {
    pub name: String,
    pub world_type: WorldType,
    pub kind: Option<ChallengeType>,
    pub difficulty: u8,
    pub description: String,
    pub starting_code: String,
    pub expected_output: String,
    pub test_cases: Vec<TestCase>,
    pub hints: Vec<String>,
    pub time_limit_ms: u64,
}

/// Assemble the outgoing challenge DTO from a resolved ref and its content.
pub fn to_out(challenge: &ChallengeRef, content: ChallengeContent, time_limit_ms: u64) -> ChallengeOut {
    ChallengeOut {
        name: challenge.name.clone(),
        world_type: challenge.world,
        kind: challenge.kind,
        difficulty: challenge.difficulty,
        description: content.description,
        starting_code: content.starting_code,
        expected_output: content.expected_output,
        test_cases: content.test_cases,
        hints: content.hints,
        time_limit_ms,
    }
}

/// Roster listing entry: enough for menus, without the content block.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeSummary {
    pub name: String,
    pub world_type: WorldType,
    pub kind: Option<ChallengeType>,
    pub difficulty: u8,
    pub skills: Vec<String>,
    pub unlocked: bool,
}

/// Dynamic challenge DTO. The expected answer stays server-side.
#[derive(Debug, Serialize)]
pub struct DynamicChallengeOut {
    pub question: String,
    pub hint: Option<String>,
}

pub fn to_dynamic_out(c: &RemoteChallenge) -> DynamicChallengeOut {
    DynamicChallengeOut { question: c.question.clone(), hint: c.hint.clone() }
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Deserialize)]
pub struct ChallengeQuery {
    #[serde(rename = "worldType")]
    pub world: WorldType,
    pub name: String,
    #[serde(default)]
    pub difficulty: Option<u8>,
}

#[derive(Debug, Deserialize)]
pub struct ChallengesQuery {
    #[serde(rename = "worldType")]
    pub world: WorldType,
    #[serde(default)]
    pub difficulty: Option<u8>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct SkillsQuery {
    #[serde(rename = "worldType")]
    pub world: WorldType,
}

#[derive(Serialize)]
pub struct SkillsOut {
    pub skills: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct DynamicChallengeQuery {
    #[serde(rename = "worldType")]
    pub world: WorldType,
    pub difficulty: u8,
    #[serde(default, rename = "forceRefresh")]
    pub force_refresh: bool,
}

#[derive(Deserialize)]
pub struct StartIn {
    #[serde(rename = "worldType")]
    pub world: WorldType,
    pub name: String,
    pub difficulty: u8,
}

#[derive(Deserialize)]
pub struct SolutionIn {
    #[serde(rename = "worldType")]
    pub world: WorldType,
    pub name: String,
    pub solution: String,
}

#[derive(Deserialize)]
pub struct DynamicAnswerIn {
    #[serde(rename = "worldType")]
    pub world: WorldType,
    pub difficulty: u8,
    pub answer: String,
}

#[derive(Serialize)]
pub struct SolutionOut {
    pub correct: bool,
    pub feedback: String,
}

#[derive(Debug, Deserialize)]
pub struct HintQuery {
    #[serde(rename = "worldType")]
    pub world: WorldType,
    pub name: String,
    #[serde(default)]
    pub difficulty: Option<u8>,
}

#[derive(Serialize)]
pub struct HintOut {
    pub text: String,
}

#[derive(Deserialize)]
pub struct CompleteIn {
    pub success: bool,
}

#[derive(Serialize)]
pub struct CompleteOut {
    pub entry: Option<PerformanceEntry>,
    pub session: SessionData,
}

#[derive(Debug, Deserialize)]
pub struct PerformanceQuery {
    #[serde(rename = "worldType")]
    pub world: WorldType,
}

#[derive(Serialize)]
pub struct ProgressOut {
    pub progress: Option<ProgressSnapshot>,
}

#[derive(Serialize)]
pub struct ReportOut {
    pub report: String,
}

#[derive(Deserialize)]
pub struct RecommendationIn {
    #[serde(rename = "worldType")]
    pub world: WorldType,
}

#[derive(Serialize)]
pub struct TextOut {
    pub text: String,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}
