//! Built-in challenge catalog: the world roster, authored content blocks,
//! the required-keyword table, and the skill taxonomy.
//!
//! The tables are compile-time constants; `Catalog::new` layers optional
//! TOML bank challenges on top and validates everything once at startup.
//! Content lookup intentionally falls back (a generic block is product
//! behavior); bank merging rejects bad entries loudly.

use std::collections::HashMap;

use rand::seq::SliceRandom;
use tracing::{error, info, instrument};

use crate::config::ChallengeCfg;
use crate::domain::{ChallengeContent, ChallengeType, TestCase, WorldType};

/// A challenge known to the catalog (built-in roster or TOML bank).
#[derive(Clone, Debug)]
pub struct Challenge {
  pub name: String,
  pub world: WorldType,
  pub kind: Option<ChallengeType>,
  pub difficulty: u8,
}

#[derive(Clone, Copy)]
struct ChallengeDef {
  name: &'static str,
  world: WorldType,
  kind: ChallengeType,
  difficulty: u8,
}

#[derive(Clone, Copy)]
struct ContentDef {
  world: WorldType,
  name: &'static str,
  description: &'static str,
  starting_code: &'static str,
  expected_output: &'static str,
  test_cases: &'static [(&'static str, &'static str)],
  hints: &'static [&'static str; 4],
}

macro_rules! chal {
  ($name:expr, $world:expr, $kind:expr, $difficulty:expr) => {
    ChallengeDef { name: $name, world: $world, kind: $kind, difficulty: $difficulty }
  };
}

macro_rules! skills {
  ($world:expr, $name:expr, $a:expr, $b:expr, $c:expr) => {
    ($world, $name, [$a, $b, $c])
  };
}

const ROSTER: &[ChallengeDef] = &[
  chal!("API Debugging", WorldType::Backend, ChallengeType::Debug, 2),
  chal!("Database Optimization", WorldType::Backend, ChallengeType::Optimization, 3),
  chal!("Load Testing", WorldType::Backend, ChallengeType::Testing, 3),
  chal!("System Architecture", WorldType::Backend, ChallengeType::Architecture, 4),
  chal!("Microservices", WorldType::Backend, ChallengeType::Design, 5),
  chal!("CSS Positioning", WorldType::Frontend, ChallengeType::Styling, 1),
  chal!("Component Layout", WorldType::Frontend, ChallengeType::Layout, 2),
  chal!("Responsive Design", WorldType::Frontend, ChallengeType::Responsive, 2),
  chal!("User Flow Design", WorldType::Frontend, ChallengeType::Ux, 3),
  chal!("Animation System", WorldType::Frontend, ChallengeType::Animation, 4),
  chal!("Data Cleaning", WorldType::DataScience, ChallengeType::Preprocessing, 2),
  chal!("Feature Engineering", WorldType::DataScience, ChallengeType::Features, 3),
  chal!("Results Analysis", WorldType::DataScience, ChallengeType::Analysis, 3),
  chal!("Model Selection", WorldType::DataScience, ChallengeType::Modeling, 4),
  chal!("ML Pipeline", WorldType::DataScience, ChallengeType::Pipeline, 5),
];

/// Skills assessed per (world, challenge). Completed entries copy these into
/// the session history; unknown pairs assess nothing.
const SKILLS: &[(WorldType, &str, [&str; 3])] = &[
  skills!(WorldType::Backend, "API Debugging", "Problem Solving", "Error Handling", "Debugging"),
  skills!(WorldType::Backend, "Database Optimization", "System Design", "Performance Optimization", "SQL"),
  skills!(WorldType::Backend, "System Architecture", "System Design", "Scalability", "Architecture"),
  skills!(WorldType::Backend, "Load Testing", "Performance Testing", "System Analysis", "Optimization"),
  skills!(WorldType::Backend, "Microservices", "Distributed Systems", "Architecture", "Scalability"),
  skills!(WorldType::Frontend, "Component Layout", "CSS Layout", "Responsive Design", "Visual Design"),
  skills!(WorldType::Frontend, "CSS Positioning", "CSS Mastery", "Layout Skills", "Problem Solving"),
  skills!(WorldType::Frontend, "User Flow Design", "UX Design", "User Empathy", "Interface Design"),
  skills!(WorldType::Frontend, "Responsive Design", "Mobile Development", "CSS Grid/Flexbox", "Adaptive Design"),
  skills!(WorldType::Frontend, "Animation System", "CSS Animation", "User Experience", "Creative Problem Solving"),
  skills!(WorldType::DataScience, "Data Cleaning", "Data Preprocessing", "Attention to Detail", "Data Quality"),
  skills!(WorldType::DataScience, "Feature Engineering", "Feature Selection", "Domain Knowledge", "Creative Thinking"),
  skills!(WorldType::DataScience, "Model Selection", "Machine Learning", "Statistical Analysis", "Model Evaluation"),
  skills!(WorldType::DataScience, "Results Analysis", "Data Interpretation", "Statistical Reasoning", "Communication"),
  skills!(WorldType::DataScience, "ML Pipeline", "MLOps", "Automation", "System Design"),
];

/// Required keywords per challenge kind, matched case-insensitively as
/// substrings of the submission.
const KEYWORDS: &[(ChallengeType, &[&str])] = &[
  (ChallengeType::Debug, &["try", "catch", "error", "validation"]),
  (ChallengeType::Optimization, &["index", "select", "where", "performance"]),
  (ChallengeType::Layout, &["grid", "flex", "responsive", "media"]),
  (ChallengeType::Styling, &["css", "position", "align", "display"]),
  (ChallengeType::Ux, &["user", "interface", "accessibility", "usability"]),
  (ChallengeType::Responsive, &["media", "query", "mobile", "tablet"]),
  (ChallengeType::Animation, &["transition", "transform", "keyframes", "animation"]),
  (ChallengeType::Preprocessing, &["clean", "null", "duplicate", "type"]),
  (ChallengeType::Features, &["feature", "encode", "transform", "aggregate"]),
  (ChallengeType::Modeling, &["model", "train", "predict", "evaluate"]),
  (ChallengeType::Analysis, &["analyze", "correlation", "pattern", "insight"]),
  (ChallengeType::Pipeline, &["pipeline", "workflow", "process", "automation"]),
];

const DEFAULT_KEYWORDS: &[&str] = &["solution", "implementation", "code"];

const CONTENT: &[ContentDef] = &[
  ContentDef {
    world: WorldType::Backend,
    name: "API Debugging",
    description: "Fix the broken API endpoint that's returning incorrect data. The endpoint should return user information but is currently throwing errors.",
    starting_code: r#"
app.get('/api/users/:id', async (req, res) => {
  try {
    const userId = req.params.id;
    const user = await User.findById(userId);
    res.json(user);
  } catch (error) {
    res.status(500).json({ error: 'Server error' });
  }
});"#,
    expected_output: "Fixed API endpoint with proper error handling and validation",
    test_cases: &[
      ("valid user ID", "User object returned"),
      ("invalid user ID", "Proper error message"),
    ],
    hints: &[
      "Check if the user exists before trying to return it",
      "Add input validation for the user ID",
      "Handle the case when user is not found",
      "Return appropriate HTTP status codes",
    ],
  },
  ContentDef {
    world: WorldType::Backend,
    name: "Database Optimization",
    description: "Optimize this slow database query. The current query takes too long when dealing with large datasets.",
    starting_code: r#"
SELECT * FROM orders o
JOIN customers c ON o.customer_id = c.id
WHERE o.order_date > '2023-01-01'
AND c.country = 'USA';"#,
    expected_output: "Optimized query with proper indexing and selective fields",
    test_cases: &[("Large dataset", "Query executes under 100ms")],
    hints: &[
      "Only select the fields you actually need",
      "Consider adding database indexes",
      "Use EXPLAIN to analyze query performance",
      "Filter early to reduce the dataset size",
    ],
  },
  ContentDef {
    world: WorldType::Frontend,
    name: "Component Layout",
    description: "Create a responsive card component layout using CSS Grid and Flexbox. The cards should adapt to different screen sizes.",
    starting_code: r#"
.card-container {
  /* Add your CSS here */
}

.card {
  /* Style individual cards */
}"#,
    expected_output: "Responsive card layout that works on all screen sizes",
    test_cases: &[
      ("Desktop view", "3 cards per row"),
      ("Tablet view", "2 cards per row"),
      ("Mobile view", "1 card per row"),
    ],
    hints: &[
      "Use CSS Grid for the main container layout",
      "Set up responsive breakpoints with media queries",
      "Consider using auto-fit or auto-fill for flexible columns",
      "Add proper spacing and padding for visual appeal",
    ],
  },
  ContentDef {
    world: WorldType::Frontend,
    name: "CSS Positioning",
    description: "Fix the layout issues in this navigation bar. Elements are overlapping and not positioned correctly.",
    starting_code: r#"
.navbar {
  background: #333;
  height: 60px;
}

.nav-item {
  color: white;
  text-decoration: none;
}"#,
    expected_output: "Properly positioned navigation bar with aligned items",
    test_cases: &[
      ("Navigation items", "Horizontally aligned"),
      ("Logo", "Left-aligned"),
      ("Menu items", "Right-aligned"),
    ],
    hints: &[
      "Use Flexbox for horizontal alignment",
      "Set justify-content to space-between for logo and menu separation",
      "Add proper padding and margins",
      "Use align-items to center vertically",
    ],
  },
  ContentDef {
    world: WorldType::DataScience,
    name: "Data Cleaning",
    description: "Clean this messy dataset by handling missing values, removing duplicates, and fixing data types.",
    starting_code: r#"
import pandas as pd
import numpy as np

# Load the dataset
df = pd.read_csv('messy_data.csv')

# Your cleaning code here
"#,
    expected_output: "Clean dataset ready for analysis",
    test_cases: &[
      ("Dataset with null values", "No missing values"),
      ("Duplicate rows", "No duplicates"),
      ("Wrong data types", "Correct data types"),
    ],
    hints: &[
      "Use df.isnull() to identify missing values",
      "Consider fillna() or dropna() for handling nulls",
      "Use drop_duplicates() to remove duplicate rows",
      "Convert data types with astype() or pd.to_datetime()",
    ],
  },
  ContentDef {
    world: WorldType::DataScience,
    name: "Feature Engineering",
    description: "Create meaningful features from the raw data to improve model performance.",
    starting_code: r#"
# Raw features available:
# - age, income, education_years, location
# - purchase_history (list of purchases)
# - signup_date

# Create new features here
"#,
    expected_output: "New engineered features that capture important patterns",
    test_cases: &[
      ("Categorical variables", "Properly encoded"),
      ("Date features", "Extracted time components"),
      ("Text features", "Numerical representations"),
    ],
    hints: &[
      "Create age groups or income brackets for categorical analysis",
      "Extract day, month, year from date fields",
      "Calculate aggregate statistics from purchase history",
      "Use one-hot encoding for categorical variables",
    ],
  },
];

/// Required keywords for a challenge kind. Kinds without a table entry (and
/// untagged challenges) use the default set.
pub fn required_keywords(kind: Option<ChallengeType>) -> &'static [&'static str] {
  match kind {
    Some(k) => KEYWORDS
      .iter()
      .find(|(kk, _)| *kk == k)
      .map(|(_, words)| *words)
      .unwrap_or(DEFAULT_KEYWORDS),
    None => DEFAULT_KEYWORDS,
  }
}

/// Skills assessed by a challenge; empty for unknown (world, name) pairs.
pub fn skills_for(world: WorldType, name: &str) -> Vec<String> {
  SKILLS
    .iter()
    .find(|(w, n, _)| *w == world && *n == name)
    .map(|(_, _, s)| s.iter().map(|x| x.to_string()).collect())
    .unwrap_or_default()
}

/// The challenge catalog: built-in roster plus validated TOML bank entries.
pub struct Catalog {
  challenges: Vec<Challenge>,
  bank_content: HashMap<(WorldType, String), ChallengeContent>,
}

impl Catalog {
  /// Build the catalog. Built-in tables are checked for internal
  /// consistency (every roster entry resolves to a skill set); bank entries
  /// with an out-of-range difficulty are skipped with a logged error.
  #[instrument(level = "info", skip_all, fields(bank = bank.len()))]
  pub fn new(bank: &[ChallengeCfg]) -> Result<Self, String> {
    for def in ROSTER {
      if skills_for(def.world, def.name).is_empty() {
        return Err(format!(
          "catalog table inconsistency: no skill taxonomy entry for ({}, {})",
          def.world, def.name
        ));
      }
      if !(1..=5).contains(&def.difficulty) {
        return Err(format!(
          "catalog table inconsistency: difficulty {} out of range for {}",
          def.difficulty, def.name
        ));
      }
    }
    for c in CONTENT {
      if !ROSTER.iter().any(|d| d.world == c.world && d.name == c.name) {
        return Err(format!(
          "catalog table inconsistency: content block ({}, {}) has no roster entry",
          c.world, c.name
        ));
      }
    }

    let mut challenges: Vec<Challenge> = ROSTER
      .iter()
      .map(|d| Challenge {
        name: d.name.to_string(),
        world: d.world,
        kind: Some(d.kind),
        difficulty: d.difficulty,
      })
      .collect();

    let mut bank_content = HashMap::new();
    for cfg in bank {
      if !(1..=5).contains(&cfg.difficulty) {
        error!(target: "challenge", name = %cfg.name, difficulty = cfg.difficulty,
               "Skipping bank challenge: difficulty out of range 1-5.");
        continue;
      }
      if challenges.iter().any(|c| c.world == cfg.world && c.name == cfg.name) {
        error!(target: "challenge", name = %cfg.name, world = %cfg.world,
               "Skipping bank challenge: shadows an existing entry.");
        continue;
      }
      if let (Some(description), Some(starting_code)) = (&cfg.description, &cfg.starting_code) {
        bank_content.insert(
          (cfg.world, cfg.name.clone()),
          ChallengeContent {
            description: description.clone(),
            starting_code: starting_code.clone(),
            expected_output: cfg
              .expected_output
              .clone()
              .unwrap_or_else(|| "Successful completion of the challenge requirements".into()),
            test_cases: vec![],
            hints: cfg.hints.clone().unwrap_or_default(),
          },
        );
      }
      challenges.push(Challenge {
        name: cfg.name.clone(),
        world: cfg.world,
        kind: cfg.kind,
        difficulty: cfg.difficulty,
      });
    }

    // Inventory summary by world, mirrored in the startup logs.
    for world in WorldType::ALL {
      let n = challenges.iter().filter(|c| c.world == world).count();
      info!(target: "challenge", %world, count = n, "Startup challenge inventory");
    }

    Ok(Self { challenges, bank_content })
  }

  pub fn challenges_for(&self, world: WorldType) -> Vec<&Challenge> {
    self.challenges.iter().filter(|c| c.world == world).collect()
  }

  pub fn get(&self, world: WorldType, name: &str) -> Option<&Challenge> {
    self.challenges.iter().find(|c| c.world == world && c.name == name)
  }

  pub fn by_difficulty(&self, world: WorldType, difficulty: u8) -> Vec<&Challenge> {
    self
      .challenges
      .iter()
      .filter(|c| c.world == world && c.difficulty == difficulty)
      .collect()
  }

  /// Random challenge in a world, optionally filtered by difficulty.
  pub fn random_challenge(&self, world: WorldType, difficulty: Option<u8>) -> Option<&Challenge> {
    let pool: Vec<&Challenge> = self
      .challenges
      .iter()
      .filter(|c| c.world == world && difficulty.map_or(true, |d| c.difficulty == d))
      .collect();
    pool.choose(&mut rand::thread_rng()).copied()
  }

  /// Case-insensitive name search across all worlds.
  pub fn search(&self, query: &str) -> Vec<&Challenge> {
    let q = query.to_lowercase();
    self
      .challenges
      .iter()
      .filter(|c| c.name.to_lowercase().contains(&q))
      .collect()
  }

  /// Challenges of a world ordered by ascending difficulty (stable for
  /// equal difficulties, keeping roster order).
  pub fn progression_path(&self, world: WorldType) -> Vec<&Challenge> {
    let mut path = self.challenges_for(world);
    path.sort_by_key(|c| c.difficulty);
    path
  }

  /// Prerequisite rule: at least half of the strictly easier challenges in
  /// the same world must already be completed.
  pub fn prerequisites_met(&self, challenge: &Challenge, completed: &[String]) -> bool {
    let easier: Vec<&Challenge> = self
      .challenges
      .iter()
      .filter(|c| c.world == challenge.world && c.difficulty < challenge.difficulty)
      .collect();
    let required = (easier.len() + 1) / 2;
    let done = easier.iter().filter(|c| completed.contains(&c.name)).count();
    done >= required
  }

  /// Distinct skills assessed anywhere in a world, in first-seen order.
  pub fn skills_for_world(&self, world: WorldType) -> Vec<String> {
    let mut out: Vec<String> = vec![];
    for c in self.challenges_for(world) {
      for s in skills_for(world, &c.name) {
        if !out.contains(&s) {
          out.push(s);
        }
      }
    }
    out
  }

  /// Authored content for a challenge: bank entries first, then the
  /// built-in table. `None` means the caller should template a generic
  /// block (intentional fallback, not an error).
  pub fn content_for(&self, world: WorldType, name: &str) -> Option<ChallengeContent> {
    if let Some(c) = self.bank_content.get(&(world, name.to_string())) {
      return Some(c.clone());
    }
    CONTENT
      .iter()
      .find(|c| c.world == world && c.name == name)
      .map(|c| ChallengeContent {
        description: c.description.to_string(),
        starting_code: c.starting_code.to_string(),
        expected_output: c.expected_output.to_string(),
        test_cases: c
          .test_cases
          .iter()
          .map(|(input, expected)| TestCase {
            input: input.to_string(),
            expected: expected.to_string(),
          })
          .collect(),
        hints: c.hints.iter().map(|h| h.to_string()).collect(),
      })
  }
}
