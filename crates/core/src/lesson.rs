//! Lesson context supplied by the calling layer

use serde::{Deserialize, Serialize};

/// Plain-text lesson excerpt plus an optional grade level (1-12).
///
/// Supplied by the caller (resolved from the content service by lesson id);
/// read-only to the pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LessonContext {
    /// Lesson title
    pub title: String,
    /// Lesson body text
    pub body: String,
}

impl LessonContext {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }

    /// The "title: body" excerpt fed into the prompt
    pub fn context_text(&self) -> String {
        if self.title.is_empty() {
            self.body.clone()
        } else if self.body.is_empty() {
            self.title.clone()
        } else {
            format!("{}: {}", self.title, self.body)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.body.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_text_joins_title_and_body() {
        let lesson = LessonContext::new("Addition basics", "Adding single digit numbers.");
        assert_eq!(
            lesson.context_text(),
            "Addition basics: Adding single digit numbers."
        );
    }

    #[test]
    fn test_context_text_partial_fields() {
        assert_eq!(LessonContext::new("Only title", "").context_text(), "Only title");
        assert_eq!(LessonContext::new("", "Only body").context_text(), "Only body");
        assert!(LessonContext::default().is_empty());
    }
}
