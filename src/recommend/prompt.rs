//! Prompt construction and response post-processing.
//!
//! Pure functions: everything here is unit-testable without a network.

use crate::models::{CategoryAverage, CommentEntry, TrainingCourse};

/// Maximum respondent comments included in the prompt.
pub const MAX_PROMPT_COMMENTS: usize = 15;

/// Comments at or below this length carry no signal and are skipped.
const MIN_COMMENT_LENGTH: usize = 10;

/// System prompt for the recommendation model.
pub const SYSTEM_PROMPT: &str = r#"You are an HR expert in people development.
Analyze the results of a 360-degree feedback assessment and produce personal development recommendations.
Take both the numeric category scores and the respondents' written comments into account.

Answer format (strictly, with no extra headings):

## Brief Analysis
2-3 sentences on the employee's current level of development.

## Strengths
- Specific competencies with high scores
- What to build on

## Growth Areas
- Areas with low scores
- What needs attention first

## Development Plan (4-6 weeks)
- [ ] Concrete action with a measurable outcome
- [ ] Next step with a deadline
- [ ] And so on (5-8 items)"#;

/// Everything the prompt builder needs from a computed report.
#[derive(Debug, Clone)]
pub struct RecommendationInput<'a> {
    pub subject_name: &'a str,
    pub cycle_name: &'a str,
    pub overall_average: f64,
    pub categories: &'a [CategoryAverage],
    pub comments: &'a [CommentEntry],
    pub courses: &'a [&'a TrainingCourse],
}

/// Build the user message of the chat request.
///
/// Kept compact on purpose: one line of category scores, at most
/// [`MAX_PROMPT_COMMENTS`] substantive comments, and the course catalog.
pub fn build_user_content(input: &RecommendationInput<'_>) -> String {
    let compact_categories = input
        .categories
        .iter()
        .map(|c| format!("{}: {:.1}", c.name, c.average))
        .collect::<Vec<_>>()
        .join(", ");

    let sample_comments = input
        .comments
        .iter()
        .filter(|c| c.text.trim().len() > MIN_COMMENT_LENGTH)
        .take(MAX_PROMPT_COMMENTS)
        .map(|c| format!("{}: \"{}\"", c.category_name, c.text.trim()))
        .collect::<Vec<_>>()
        .join("\n");

    let mut lines = vec![
        format!("Employee: {}", input.subject_name),
        format!("Cycle: {}", input.cycle_name),
        format!("Overall score: {:.1}/5.0", input.overall_average),
        String::new(),
        format!("Category scores: {}", compact_categories),
        String::new(),
        "Key comments:".to_string(),
        if sample_comments.is_empty() {
            "No comments were provided".to_string()
        } else {
            sample_comments
        },
    ];

    if !input.courses.is_empty() {
        lines.push(String::new());
        lines.push("Training courses available for the development plan:".to_string());
        for course in input.courses {
            if course.description.is_empty() {
                lines.push(format!("- {}", course.name));
            } else {
                lines.push(format!("- {}: {}", course.name, course.description));
            }
        }
    }

    lines.join("\n")
}

/// Remove `<think>…</think>` reasoning blocks some models emit.
///
/// Unmatched opening tags are left as-is.
pub fn strip_think_blocks(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut rest = text;

    loop {
        // ASCII lowering keeps byte offsets aligned with the original.
        let lower: String = rest.chars().map(|c| c.to_ascii_lowercase()).collect();
        match lower.find("<think>") {
            Some(start) => match lower[start..].find("</think>") {
                Some(rel_end) => {
                    let end = start + rel_end + "</think>".len();
                    result.push_str(&rest[..start]);
                    rest = &rest[end..];
                }
                None => {
                    result.push_str(rest);
                    break;
                }
            },
            None => {
                result.push_str(rest);
                break;
            }
        }
    }

    result.trim().to_string()
}

/// Collapse runs of three or more newlines into a blank line.
pub fn collapse_blank_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut newlines = 0usize;

    for ch in text.chars() {
        if ch == '\n' {
            newlines += 1;
            if newlines <= 2 {
                out.push(ch);
            }
        } else {
            newlines = 0;
            out.push(ch);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{zeroed_distribution, RespondentRole};

    fn category(name: &str, average: f64) -> CategoryAverage {
        CategoryAverage {
            id: name.to_lowercase(),
            name: name.to_string(),
            color: "#3B82F6".to_string(),
            average,
            count: 4,
            distribution: zeroed_distribution(),
        }
    }

    fn comment(category: &str, text: &str) -> CommentEntry {
        CommentEntry {
            category_name: category.to_string(),
            question_text: "Open feedback".to_string(),
            respondent_role: RespondentRole::Peer,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_user_content_includes_scores_and_comments() {
        let categories = vec![category("Leadership", 4.25), category("Communication", 3.0)];
        let comments = vec![comment("Leadership", "Takes ownership of hard problems")];
        let course = TrainingCourse {
            name: "Situational Leadership".to_string(),
            description: "Adapting leadership style".to_string(),
            is_active: true,
        };
        let courses = vec![&course];

        let input = RecommendationInput {
            subject_name: "Dana Reyes",
            cycle_name: "Q1 2025",
            overall_average: 3.63,
            categories: &categories,
            comments: &comments,
            courses: &courses,
        };

        let content = build_user_content(&input);
        assert!(content.contains("Employee: Dana Reyes"));
        assert!(content.contains("Overall score: 3.6/5.0"));
        assert!(content.contains("Leadership: 4.2"));
        assert!(content.contains("Takes ownership"));
        assert!(content.contains("Situational Leadership: Adapting leadership style"));
    }

    #[test]
    fn test_user_content_caps_comments() {
        let categories = vec![category("Teamwork", 3.5)];
        let comments: Vec<CommentEntry> = (0..30)
            .map(|i| comment("Teamwork", &format!("A sufficiently long comment number {}", i)))
            .collect();

        let input = RecommendationInput {
            subject_name: "Dana Reyes",
            cycle_name: "Q1 2025",
            overall_average: 3.5,
            categories: &categories,
            comments: &comments,
            courses: &[],
        };

        let content = build_user_content(&input);
        let quoted = content.matches("Teamwork: \"").count();
        assert_eq!(quoted, MAX_PROMPT_COMMENTS);
    }

    #[test]
    fn test_short_comments_are_skipped() {
        let categories = vec![category("Teamwork", 3.5)];
        let comments = vec![comment("Teamwork", "ok"), comment("Teamwork", "+1")];

        let input = RecommendationInput {
            subject_name: "Dana Reyes",
            cycle_name: "Q1 2025",
            overall_average: 3.5,
            categories: &categories,
            comments: &comments,
            courses: &[],
        };

        let content = build_user_content(&input);
        assert!(content.contains("No comments were provided"));
    }

    #[test]
    fn test_strip_think_blocks() {
        let raw = "<think>working it out...</think>## Brief Analysis\nSolid performer.";
        assert_eq!(
            strip_think_blocks(raw),
            "## Brief Analysis\nSolid performer."
        );

        let mixed = "Intro <THINK>hidden</THINK> outro";
        assert_eq!(strip_think_blocks(mixed), "Intro  outro");

        let unmatched = "text <think>never closed";
        assert_eq!(strip_think_blocks(unmatched), "text <think>never closed");
    }

    #[test]
    fn test_collapse_blank_lines() {
        let text = "a\n\n\n\nb\n\nc";
        assert_eq!(collapse_blank_lines(text), "a\n\nb\n\nc");
    }
}
