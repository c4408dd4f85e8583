//! Grade-calibrated prompt assembly
//!
//! Pure functions of `(question, lesson context, grade level)`; no I/O, no
//! failure modes. The same inputs always yield the same `PromptSpec`.

use voice_qna_core::{LessonContext, PromptSpec};

/// Coarse bucket of school grade levels selecting response complexity
/// and tone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradeBand {
    /// Grades 1-2 (ages 5-7)
    EarlyChildhood,
    /// Grades 3-5 (ages 8-11)
    Elementary,
    /// Grades 6-8 (ages 12-14)
    MiddleSchool,
    /// Grade 9+ or unspecified
    General,
}

impl GradeBand {
    /// Band for an optional grade level. Absent or out-of-domain grades
    /// (0, or anything past 12) map to the generic assistant register.
    pub fn from_grade(grade_level: Option<u8>) -> Self {
        match grade_level {
            Some(g) if (1..=2).contains(&g) => GradeBand::EarlyChildhood,
            Some(g) if (3..=5).contains(&g) => GradeBand::Elementary,
            Some(g) if (6..=8).contains(&g) => GradeBand::MiddleSchool,
            _ => GradeBand::General,
        }
    }

    /// System instruction for this band
    pub fn instruction(&self) -> &'static str {
        match self {
            GradeBand::EarlyChildhood => {
                "You are a friendly teacher for very young students (ages 5-7). \
                 Use simple words, gentle tone, and clear explanations."
            }
            GradeBand::Elementary => {
                "You are an elementary school teacher (ages 8-11). \
                 Be encouraging and explain step-by-step in simple language."
            }
            GradeBand::MiddleSchool => {
                "You are a middle school teacher (ages 12-14). \
                 Be clear and supportive with examples."
            }
            GradeBand::General => {
                "You are an AI teaching assistant. Provide clear, concise, and \
                 helpful explanations."
            }
        }
    }
}

/// Assemble the prompt sent to the generation backend.
///
/// The length ceiling is enforced downstream by the request's max-token
/// hint, not by truncating here.
pub fn build_prompt(
    question: &str,
    lesson: Option<&LessonContext>,
    grade_level: Option<u8>,
) -> PromptSpec {
    // Grades outside 1-12 carry no signal; treat them like an absent field
    let grade_level = grade_level.filter(|g| (1..=12).contains(g));
    let band = GradeBand::from_grade(grade_level);
    let lesson_context = lesson.map(|l| l.context_text()).unwrap_or_default();
    let grade_label = grade_level
        .map(|g| g.to_string())
        .unwrap_or_else(|| "elementary".to_string());

    let text = format!(
        "{instruction}\n\n\
         Lesson Context:\n{lesson_context}\n\n\
         Student Question:\n{question}\n\n\
         Provide a friendly, concise answer appropriate for Grade {grade_label} students.\n\
         Answer:",
        instruction = band.instruction(),
        lesson_context = lesson_context,
        question = question,
        grade_label = grade_label,
    );

    PromptSpec::new(text)
}
