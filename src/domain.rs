//! Domain models used by the backend: world tracks, challenge kinds, content
//! blocks, and solution-check outcomes.

use serde::{Deserialize, Serialize};

/// Career track a challenge belongs to.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum WorldType {
  Backend,
  Frontend,
  DataScience,
}

impl WorldType {
  pub const ALL: [WorldType; 3] = [WorldType::Backend, WorldType::Frontend, WorldType::DataScience];

  /// Wire/storage name, matching the front end's world identifiers.
  pub fn as_str(&self) -> &'static str {
    match self {
      WorldType::Backend => "backend",
      WorldType::Frontend => "frontend",
      WorldType::DataScience => "datascience",
    }
  }

  /// Occupation string expected by the remote challenge API.
  pub fn occupation(&self) -> &'static str {
    match self {
      WorldType::Backend => "Backend Engineer",
      WorldType::Frontend => "Frontend Engineer",
      WorldType::DataScience => "Data Scientist",
    }
  }
}

impl std::fmt::Display for WorldType {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Category tag a challenge is validated under. Determines which keyword set
/// `check_solution` requires.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeType {
  Debug,
  Optimization,
  Design,
  Layout,
  Styling,
  Ux,
  Responsive,
  Animation,
  Preprocessing,
  Features,
  Modeling,
  Analysis,
  Pipeline,
  Testing,
  Architecture,
}

impl ChallengeType {
  pub fn as_str(&self) -> &'static str {
    match self {
      ChallengeType::Debug => "debug",
      ChallengeType::Optimization => "optimization",
      ChallengeType::Design => "design",
      ChallengeType::Layout => "layout",
      ChallengeType::Styling => "styling",
      ChallengeType::Ux => "ux",
      ChallengeType::Responsive => "responsive",
      ChallengeType::Animation => "animation",
      ChallengeType::Preprocessing => "preprocessing",
      ChallengeType::Features => "features",
      ChallengeType::Modeling => "modeling",
      ChallengeType::Analysis => "analysis",
      ChallengeType::Pipeline => "pipeline",
      ChallengeType::Testing => "testing",
      ChallengeType::Architecture => "architecture",
    }
  }
}

impl std::fmt::Display for ChallengeType {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Identifies a challenge for content generation, checking, and hints.
/// `kind` is optional: bank or ad-hoc challenges may not carry a category
/// tag, in which case checking uses the default keyword set.
#[derive(Clone, Debug)]
pub struct ChallengeRef {
  pub name: String,
  pub world: WorldType,
  pub kind: Option<ChallengeType>,
  pub difficulty: u8,
}

/// One test case shown to the player alongside a challenge.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TestCase {
  pub input: String,
  pub expected: String,
}

/// Descriptive content block for a challenge, served to the front end.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeContent {
  pub description: String,
  pub starting_code: String,
  pub expected_output: String,
  pub test_cases: Vec<TestCase>,
  pub hints: Vec<String>,
}

/// Outcome of a solution check. Validation failures are ordinary values
/// carrying corrective feedback, not errors.
#[derive(Clone, Debug, Serialize)]
pub struct SolutionCheck {
  pub correct: bool,
  pub feedback: String,
}

/// Payload returned by the remote challenge-generation endpoint.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RemoteChallenge {
  pub question: String,
  #[serde(default)] pub answer: Option<String>,
  #[serde(default)] pub hint: Option<String>,
}
