//! Built-in note templates.
//!
//! Each template is a fixed, ordered list of field labels. The catalog is
//! static data: lookups hand out shared slices and never allocate.

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    NonTechnical,
    Technical,
}

#[derive(Debug)]
pub struct Template {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub category: Category,
    pub fields: &'static [&'static str],
}

pub static CATALOG: &[Template] = &[
    Template {
        id: "Cornell",
        name: "Cornell Notes",
        description: "Two-column system with cues and summary section",
        category: Category::NonTechnical,
        fields: &[
            "Keywords/Cues (Left Column)",
            "Notes (Right Column)",
            "Summary (Bottom)",
        ],
    },
    Template {
        id: "Frayer",
        name: "Frayer Model",
        description: "Vocabulary and concept organizer with examples",
        category: Category::NonTechnical,
        fields: &[
            "Concept/Term",
            "Definition (What it is)",
            "Characteristics (Facts)",
            "Examples",
            "Non-Examples",
        ],
    },
    Template {
        id: "MainIdea",
        name: "Main Idea & Details",
        description: "Topic breakdown with supporting details",
        category: Category::NonTechnical,
        fields: &[
            "Main Topic",
            "Core Idea/Thesis",
            "Supporting Detail 1",
            "Supporting Detail 2",
            "Supporting Detail 3",
        ],
    },
    Template {
        id: "KWLH",
        name: "K-W-L-H Method",
        description: "Know, Want to know, Learned, How to learn more",
        category: Category::NonTechnical,
        fields: &[
            "K: What I KNOW",
            "W: What I WANT to know",
            "L: What I LEARNED",
            "H: HOW I can learn more (Application)",
        ],
    },
    Template {
        id: "SQ3R",
        name: "SQ3R Reading",
        description: "Survey, Question, Read, Recite, Review strategy",
        category: Category::NonTechnical,
        fields: &[
            "Survey (Title, Headings)",
            "Question (Convert Headings to Questions)",
            "Read (Active Note-taking)",
            "Recite (Answer Questions)",
            "Review (Self-Test)",
        ],
    },
    Template {
        id: "Timeline",
        name: "Timeline Mapping",
        description: "Chronological event tracking and analysis",
        category: Category::NonTechnical,
        fields: &[
            "Starting Event/Date",
            "Intermediate Event/Date 1",
            "Intermediate Event/Date 2",
            "Final Event/Outcome",
            "Notes on Significance",
        ],
    },
    Template {
        id: "Polya",
        name: "Polya's 4 Steps",
        description: "Systematic problem-solving methodology",
        category: Category::Technical,
        fields: &[
            "Step 1: Understand the Problem",
            "Step 2: Devise a Plan",
            "Step 3: Carry out the Plan",
            "Step 4: Look Back/Review",
        ],
    },
    Template {
        id: "5W1H",
        name: "5W1H Analysis",
        description: "What, Why, When, Where, Who, How framework",
        category: Category::Technical,
        fields: &[
            "What is the problem/subject?",
            "Why is it important?",
            "When did it happen/occur?",
            "Where is it applied?",
            "Who is involved?",
            "How does it work/How to solve it?",
        ],
    },
    Template {
        id: "ConceptMap",
        name: "Concept Mapping",
        description: "Visual relationship and connection builder",
        category: Category::Technical,
        fields: &[
            "Central Concept",
            "Related Concept 1",
            "Related Concept 2",
            "Linking Words (Concept 1 to 2)",
        ],
    },
    Template {
        id: "Feynman",
        name: "Feynman Technique",
        description: "Explain concepts in simple terms to master them",
        category: Category::Technical,
        fields: &[
            "Concept Name",
            "Explain in Simple Terms",
            "Identify Knowledge Gaps",
            "Simplify and Use Analogies",
        ],
    },
    Template {
        id: "TwoColumn",
        name: "Two-Column Notes",
        description: "Problem and solution paired format",
        category: Category::Technical,
        fields: &["Problem/Question", "Solution/Answer"],
    },
];

pub fn lookup(id: &str) -> Result<&'static Template> {
    CATALOG
        .iter()
        .find(|t| t.id == id)
        .ok_or_else(|| Error::UnknownTemplate(id.to_string()))
}

/// Ordered field labels of a registered template.
pub fn fields_for(id: &str) -> Result<&'static [&'static str]> {
    lookup(id).map(|t| t.fields)
}
