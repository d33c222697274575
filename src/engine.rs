//! Challenge content generation and solution checking.
//!
//! `check_solution` is a textual heuristic, not code execution: it verifies
//! length, placeholder removal, and the presence of the kind's required
//! keywords as case-insensitive substrings. That makes it gameable by
//! listing keywords without a working solution; this is intentional product
//! behavior, kept as-is.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::catalog::{required_keywords, Catalog};
use crate::domain::{ChallengeContent, ChallengeRef, SolutionCheck, TestCase};

const MIN_SOLUTION_CHARS: usize = 20;
const PLACEHOLDER_MARKERS: &[&str] = &["// Your code here", "// Your solution here"];

/// Base time allowance per challenge before the difficulty multiplier.
const BASE_TIME_LIMIT_MS: u64 = 300_000;

pub struct ChallengeEngine {
  catalog: Arc<Catalog>,
}

impl ChallengeEngine {
  pub fn new(catalog: Arc<Catalog>) -> Self {
    Self { catalog }
  }

  /// Content for a named challenge. Unknown names get a generic block
  /// templated from the name; this never fails.
  #[instrument(level = "debug", skip(self), fields(world = %challenge.world, name = %challenge.name))]
  pub fn generate_challenge(&self, challenge: &ChallengeRef) -> ChallengeContent {
    if let Some(content) = self.catalog.content_for(challenge.world, &challenge.name) {
      return content;
    }
    debug!(target: "challenge", name = %challenge.name, "No authored content; serving generic block");
    generic_challenge(challenge)
  }

  /// Heuristic check of a submitted solution. Returns a user-facing outcome
  /// with corrective feedback; never an error.
  #[instrument(level = "info", skip(self, solution), fields(name = %challenge.name, solution_len = solution.len()))]
  pub fn check_solution(&self, challenge: &ChallengeRef, solution: &str) -> SolutionCheck {
    if solution.trim().chars().count() < MIN_SOLUTION_CHARS {
      return SolutionCheck {
        correct: false,
        feedback: "Your solution seems too short. Please provide a more detailed implementation."
          .into(),
      };
    }

    if PLACEHOLDER_MARKERS.iter().any(|m| solution.contains(m)) {
      return SolutionCheck {
        correct: false,
        feedback: "Please replace the placeholder comments with your actual solution.".into(),
      };
    }

    let lower = solution.to_lowercase();
    let missing: Vec<&str> = required_keywords(challenge.kind)
      .iter()
      .filter(|kw| !lower.contains(&kw.to_lowercase()))
      .copied()
      .collect();
    if !missing.is_empty() {
      return SolutionCheck {
        correct: false,
        feedback: format!(
          "Your solution is missing some key elements. Consider including: {}",
          missing.join(", ")
        ),
      };
    }

    SolutionCheck {
      correct: true,
      feedback: "Excellent work! Your solution demonstrates good understanding of the concepts."
        .into(),
    }
  }

  /// Check an answer against a dynamic challenge's expected answer.
  ///
  /// Single-letter expected answers are multiple choice: the first ASCII
  /// letter the player typed is compared case-insensitively. Free-form
  /// answers compare the whole trimmed text case-insensitively. Feedback
  /// never reveals the expected answer.
  #[instrument(level = "info", skip(self, expected, submitted), fields(submitted_len = submitted.len()))]
  pub fn check_dynamic_answer(&self, expected: &str, submitted: &str) -> SolutionCheck {
    let expected = expected.trim();
    let mc_letter = single_letter(expected);

    let correct = if let Some(letter) = mc_letter {
      match first_ascii_letter(submitted) {
        Some(typed) => typed.eq_ignore_ascii_case(&letter),
        None => {
          return SolutionCheck {
            correct: false,
            feedback: "Answer with the letter of the option you choose.".into(),
          }
        }
      }
    } else {
      submitted.trim().to_uppercase() == expected.to_uppercase()
    };

    if correct {
      SolutionCheck { correct: true, feedback: "Correct! Nice work.".into() }
    } else {
      SolutionCheck {
        correct: false,
        feedback: "That's not it. Re-read the question and try again.".into(),
      }
    }
  }

  pub fn difficulty_multiplier(&self, difficulty: u8) -> f64 {
    (f64::from(difficulty) * 0.5).max(1.0)
  }

  /// Time allowance for a challenge, in milliseconds.
  pub fn time_limit_ms(&self, difficulty: u8) -> u64 {
    (BASE_TIME_LIMIT_MS as f64 * self.difficulty_multiplier(difficulty)) as u64
  }
}

fn generic_challenge(challenge: &ChallengeRef) -> ChallengeContent {
  ChallengeContent {
    description: format!(
      "Complete this {} challenge: {}. Apply your knowledge to solve this real-world problem.",
      challenge.world, challenge.name
    ),
    starting_code: format!("// {} challenge\n// Your solution here...", challenge.name),
    expected_output: "Successful completion of the challenge requirements".into(),
    test_cases: vec![
      TestCase { input: "Test case 1".into(), expected: "Expected output 1".into() },
      TestCase { input: "Test case 2".into(), expected: "Expected output 2".into() },
    ],
    hints: vec![
      "Break down the problem into smaller steps".into(),
      "Consider the requirements carefully".into(),
      "Test your solution with different inputs".into(),
      "Think about edge cases and error handling".into(),
    ],
  }
}

/// The single ASCII letter of a trimmed expected answer, if it is one.
fn single_letter(expected: &str) -> Option<char> {
  let mut chars = expected.chars();
  match (chars.next(), chars.next()) {
    (Some(c), None) if c.is_ascii_alphabetic() => Some(c),
    _ => None,
  }
}

fn first_ascii_letter(text: &str) -> Option<char> {
  text.chars().find(|c| c.is_ascii_alphabetic())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{ChallengeType, WorldType};

  fn engine() -> ChallengeEngine {
    ChallengeEngine::new(Arc::new(Catalog::new(&[]).unwrap()))
  }

  fn debug_challenge() -> ChallengeRef {
    ChallengeRef {
      name: "API Debugging".into(),
      world: WorldType::Backend,
      kind: Some(ChallengeType::Debug),
      difficulty: 2,
    }
  }

  #[test]
  fn short_solutions_fail_regardless_of_keywords() {
    let check = engine().check_solution(&debug_challenge(), "try catch error");
    assert!(!check.correct);
    assert!(check.feedback.contains("too short"));
  }

  #[test]
  fn placeholder_markers_fail() {
    let check = engine().check_solution(
      &debug_challenge(),
      "// Your solution here lots of extra text to pass length",
    );
    assert!(!check.correct);
    assert!(check.feedback.contains("placeholder"));
  }

  #[test]
  fn missing_keywords_are_named_in_feedback() {
    let check = engine().check_solution(
      &debug_challenge(),
      "I would add a try block and catch the failure somewhere here.",
    );
    assert!(!check.correct);
    assert!(check.feedback.contains("error"));
    assert!(check.feedback.contains("validation"));
  }

  #[test]
  fn debug_solution_with_all_keywords_passes() {
    let check = engine().check_solution(
      &debug_challenge(),
      "Wrap in TRY/Catch, return a clear ERROR message and add input Validation.",
    );
    assert!(check.correct, "{}", check.feedback);
  }

  #[test]
  fn untagged_challenges_use_default_keywords() {
    let challenge = ChallengeRef {
      name: "Something New".into(),
      world: WorldType::Backend,
      kind: None,
      difficulty: 1,
    };
    let check = engine().check_solution(
      &challenge,
      "My solution: the implementation ships working code for this task.",
    );
    assert!(check.correct, "{}", check.feedback);
  }

  #[test]
  fn generic_content_is_templated_from_the_name() {
    let challenge = ChallengeRef {
      name: "Cache Warmup".into(),
      world: WorldType::Backend,
      kind: None,
      difficulty: 1,
    };
    let content = engine().generate_challenge(&challenge);
    assert!(content.description.contains("Cache Warmup"));
    assert!(content.starting_code.contains("// Cache Warmup challenge"));
    assert_eq!(content.hints.len(), 4);
  }

  #[test]
  fn authored_content_is_served_when_present() {
    let content = engine().generate_challenge(&debug_challenge());
    assert!(content.description.contains("broken API endpoint"));
    assert_eq!(content.test_cases.len(), 2);
  }

  #[test]
  fn multiple_choice_answers_match_on_first_letter() {
    let e = engine();
    assert!(e.check_dynamic_answer("B", "b) use an index").correct);
    assert!(e.check_dynamic_answer("b", "B").correct);
    assert!(!e.check_dynamic_answer("B", "a").correct);
    // Only the first letter counts, even when the right one appears later.
    assert!(!e.check_dynamic_answer("B", "it must be B").correct);
    // Digits are not option letters.
    assert!(e.check_dynamic_answer("C", "1. c").correct);
  }

  #[test]
  fn free_form_answers_compare_whole_trimmed_text() {
    let e = engine();
    assert!(e.check_dynamic_answer("Binary Search", "  binary search ").correct);
    assert!(!e.check_dynamic_answer("Binary Search", "binary").correct);
  }

  #[test]
  fn failure_feedback_never_reveals_the_answer() {
    let e = engine();
    let check = e.check_dynamic_answer("QUICKSORT", "mergesort");
    assert!(!check.correct);
    assert!(!check.feedback.to_lowercase().contains("quicksort"));
    let check = e.check_dynamic_answer("B", "a");
    assert!(!check.feedback.contains('B'));
  }

  #[test]
  fn time_limit_scales_with_difficulty() {
    let e = engine();
    assert_eq!(e.time_limit_ms(1), 300_000);
    assert_eq!(e.time_limit_ms(2), 300_000);
    assert_eq!(e.time_limit_ms(3), 450_000);
    assert_eq!(e.time_limit_ms(5), 750_000);
  }
}
