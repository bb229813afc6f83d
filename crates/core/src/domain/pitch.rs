use serde::{Deserialize, Serialize};

use crate::domain::mode::Mode;
use crate::errors::DomainError;

/// The three user-supplied inputs every pitch is built from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PitchRequest {
    pub industry: String,
    pub audience: String,
    pub keyword: String,
}

impl PitchRequest {
    pub fn new(
        industry: impl AsRef<str>,
        audience: impl AsRef<str>,
        keyword: impl AsRef<str>,
    ) -> Result<Self, DomainError> {
        Ok(Self {
            industry: required("industry", industry.as_ref())?,
            audience: required("audience", audience.as_ref())?,
            keyword: required("keyword", keyword.as_ref())?,
        })
    }

    /// Human-readable task line recorded with each run. It is advisory only and
    /// never changes which tools run.
    pub fn task_description(&self, mode: Mode) -> String {
        match mode {
            Mode::Silly => format!(
                "First, get some inspiration from recent HackerNews stories, then generate a \
                 startup pitch for a {} company targeting {} that includes the word '{}'. Make \
                 the pitch creative and incorporate relevant trends from the HackerNews stories.",
                self.industry, self.audience, self.keyword
            ),
            Mode::Serious => format!(
                "First, review recent business news headlines, then write a professional startup \
                 plan for a {} company targeting {} that incorporates the concept '{}'. Ground \
                 the plan in the current market trends from the news.",
                self.industry, self.audience, self.keyword
            ),
        }
    }
}

fn required(field: &'static str, value: &str) -> Result<String, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::MissingField(field));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::PitchRequest;
    use crate::domain::mode::Mode;
    use crate::errors::DomainError;

    #[test]
    fn trims_all_fields() {
        let request = PitchRequest::new(" tech ", "students\n", " cloud").expect("valid request");
        assert_eq!(request.industry, "tech");
        assert_eq!(request.audience, "students");
        assert_eq!(request.keyword, "cloud");
    }

    #[test]
    fn blank_field_is_rejected_with_field_name() {
        let error = PitchRequest::new("tech", "   ", "cloud").expect_err("blank audience");
        assert_eq!(error, DomainError::MissingField("audience"));
    }

    #[test]
    fn task_description_mentions_inputs_for_both_modes() {
        let request = PitchRequest::new("fintech", "retirees", "llama").expect("valid request");

        let silly = request.task_description(Mode::Silly);
        assert!(silly.contains("HackerNews"));
        assert!(silly.contains("'llama'"));

        let serious = request.task_description(Mode::Serious);
        assert!(serious.contains("business news"));
        assert!(serious.contains("fintech company targeting retirees"));
    }
}
