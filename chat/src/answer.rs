use ai::AiError;

/// Shown whenever the agent fails or has nothing useful to say.
pub const FALLBACK_ANSWER: &str = "No data found in the database.";

/// Answers treated as "nothing found", compared trimmed and lowercased.
///
/// `o'connell` is a literal the model has been seen echoing back instead of
/// an answer; it is kept as-is rather than generalised.
pub const SENTINEL_ANSWERS: [&str; 4] = ["o'connell", "no data found", "none", "null"];

/// What came back from the agent for one question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentOutcome {
    Answer(String),
    Failure(String),
}

impl From<Result<String, AiError>> for AgentOutcome {
    fn from(result: Result<String, AiError>) -> Self {
        match result {
            Ok(answer) => AgentOutcome::Answer(answer),
            Err(err) => AgentOutcome::Failure(err.to_string()),
        }
    }
}

/// Text to record for `outcome`. Failures, empty answers and sentinel
/// answers all become [`FALLBACK_ANSWER`]; anything else passes through untouched.
#[must_use]
pub fn normalize_answer(outcome: &AgentOutcome) -> String {
    match outcome {
        AgentOutcome::Answer(text) if !is_sentinel(text) => text.clone(),
        AgentOutcome::Answer(_) | AgentOutcome::Failure(_) => FALLBACK_ANSWER.to_string(),
    }
}

fn is_sentinel(text: &str) -> bool {
    let trimmed = text.trim().to_lowercase();
    trimmed.is_empty() || SENTINEL_ANSWERS.contains(&trimmed.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(text: &str) -> String {
        normalize_answer(&AgentOutcome::Answer(text.to_string()))
    }

    #[test]
    fn real_answers_pass_through_verbatim() {
        assert_eq!(answer("There are 42 employees."), "There are 42 employees.");
        assert_eq!(answer("  None of them.  "), "  None of them.  ");
    }

    #[test]
    fn sentinels_ignore_case_and_whitespace() {
        for text in [
            "",
            "   ",
            "None",
            " NULL\n",
            "No Data Found",
            "O'Connell",
            "\to'connell ",
        ] {
            assert_eq!(answer(text), FALLBACK_ANSWER, "input {text:?}");
        }
    }

    #[test]
    fn fallback_is_a_fixed_point() {
        assert_eq!(answer(FALLBACK_ANSWER), FALLBACK_ANSWER);
    }

    #[test]
    fn every_failure_reads_the_same() {
        for err in [
            AiError::Network("connection refused".to_string()),
            AiError::RateLimited,
            AiError::Api("HTTP 401".to_string()),
            AiError::MaxRounds(15),
        ] {
            let outcome = AgentOutcome::from(Err(err));
            assert!(matches!(outcome, AgentOutcome::Failure(_)));
            assert_eq!(normalize_answer(&outcome), FALLBACK_ANSWER);
        }
    }

    #[test]
    fn ok_results_become_answers() {
        assert_eq!(
            AgentOutcome::from(Ok("42".to_string())),
            AgentOutcome::Answer("42".to_string())
        );
    }
}
