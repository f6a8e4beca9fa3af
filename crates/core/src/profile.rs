use serde::{Deserialize, Serialize};

/// The broad question domain for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldCategory {
    #[default]
    General,
    Technical,
    Behavioral,
    Leadership,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssessmentType {
    #[default]
    Mock,
    Screening,
    Practice,
}

/// Everything the question generators are allowed to know about the
/// candidate. Explicit fields with defaults, so an absent field is a
/// default and never a lookup into an untyped bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateProfile {
    pub title: String,
    pub field_category: FieldCategory,
    pub skills: Vec<String>,
    pub experience_years: u32,
    pub difficulty: Difficulty,
    pub assessment_type: AssessmentType,
}

impl Default for CandidateProfile {
    fn default() -> Self {
        Self {
            title: "Software Engineer".to_string(),
            field_category: FieldCategory::default(),
            skills: Vec::new(),
            experience_years: 0,
            difficulty: Difficulty::default(),
            assessment_type: AssessmentType::default(),
        }
    }
}
