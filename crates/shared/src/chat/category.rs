use crate::models::CategoryLabel;

/// Scanned in order; the first category with a matching keyword wins.
pub const CATEGORY_KEYWORDS: &[(CategoryLabel, &[&str])] = &[
    (
        CategoryLabel::Projects,
        &[
            "project", "built", "build", "app", "application", "website", "github", "repo",
            "portfolio piece",
        ],
    ),
    (
        CategoryLabel::Experience,
        &[
            "experience", "job", "work", "role", "company", "companies", "employer",
            "position", "career", "intern",
        ],
    ),
    (
        CategoryLabel::Skills,
        &[
            "skill", "language", "framework", "technology", "technologies", "tech stack", "tool",
            "proficient", "expertise",
        ],
    ),
    (
        CategoryLabel::Achievements,
        &[
            "achievement", "award", "won", "accomplish", "accomplishment", "recognition",
            "hackathon", "prize",
        ],
    ),
    (
        CategoryLabel::Education,
        &[
            "education", "degree", "university", "college", "school", "study", "studied",
            "graduate", "gpa",
        ],
    ),
    (
        CategoryLabel::Certificates,
        &["certificate", "certification", "certified", "course", "credential"],
    ),
    (
        CategoryLabel::Testimonials,
        &["testimonial", "recommendation", "review", "feedback", "what people say", "endorse"],
    ),
    (
        CategoryLabel::Contact,
        &[
            "contact", "email", "phone", "reach", "linkedin", "twitter", "hire", "get in touch",
        ],
    ),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryMatch {
    NoMismatch,
    Suggest(CategoryLabel),
}

/// Endings a keyword may carry and still count, so "project" covers "projects".
const INFLECTIONS: &[&str] = &["s", "es", "d", "ed", "ing", "ment", "ments", "ship", "ships"];

/// First category whose keywords appear in `text` as whole words, if any.
pub fn classify(text: &str) -> Option<CategoryLabel> {
    let lowered = text.to_lowercase();
    let words = words_of(&lowered);
    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|keyword| mentions(&words, keyword)))
        .map(|(label, _)| *label)
}

/// Apostrophes stay inside words so "won't" is not read as "won".
fn words_of(text: &str) -> Vec<&str> {
    text.split(|ch: char| !(ch.is_alphanumeric() || ch == '\''))
        .filter(|word| !word.is_empty())
        .collect()
}

/// Multi-word keywords must appear as consecutive words; only the last word may
/// be inflected.
fn mentions(words: &[&str], keyword: &str) -> bool {
    let parts = words_of(keyword);
    let Some((last, leading)) = parts.split_last() else {
        return false;
    };

    words.windows(parts.len()).any(|window| {
        window[..leading.len()] == *leading && inflects(window[leading.len()], last)
    })
}

fn inflects(word: &str, stem: &str) -> bool {
    word.strip_prefix(stem)
        .is_some_and(|rest| rest.is_empty() || INFLECTIONS.contains(&rest))
}

pub fn detect_category_mismatch(text: &str, selected: CategoryLabel) -> CategoryMatch {
    if selected == CategoryLabel::All {
        return CategoryMatch::NoMismatch;
    }

    match classify(text) {
        Some(detected) if detected != selected => CategoryMatch::Suggest(detected),
        _ => CategoryMatch::NoMismatch,
    }
}
