use serde::{de, Deserialize, Deserializer, Serialize};
use std::fmt;

/// Broad situation a scenario is set in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Daily,
    Business,
    Travel,
    Shopping,
    Dining,
    Medical,
    Social,
    Education,
}

/// How demanding the expected answer is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Category::Daily => "daily",
            Category::Business => "business",
            Category::Travel => "travel",
            Category::Shopping => "shopping",
            Category::Dining => "dining",
            Category::Medical => "medical",
            Category::Social => "social",
            Category::Education => "education",
        };
        f.write_str(label)
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        };
        f.write_str(label)
    }
}

/// A practice prompt issued by the scenario provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub prompt: String,
    pub context: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_translation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_translation: Option<String>,
    pub category: Category,
    pub difficulty: Difficulty,
}

/// Per-dimension scores, each in 0..=100
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    #[serde(deserialize_with = "score")]
    pub pronunciation: u8,
    #[serde(deserialize_with = "score")]
    pub grammar: u8,
    #[serde(deserialize_with = "score")]
    pub relevance: u8,
    #[serde(deserialize_with = "score")]
    pub fluency: u8,
    #[serde(deserialize_with = "score")]
    pub overall: u8,
}

/// Accept any JSON number in 0..=100, rounded to the nearest whole point
fn score<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(de::Error::custom(format!(
            "score {} is outside 0..=100",
            value
        )));
    }
    Ok(value.round() as u8)
}

/// Coarse grade used when presenting a score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    Excellent,
    Good,
    NeedsWork,
}

impl ScoreBand {
    pub fn from_score(score: u8) -> Self {
        match score {
            90.. => ScoreBand::Excellent,
            70..=89 => ScoreBand::Good,
            _ => ScoreBand::NeedsWork,
        }
    }
}

impl Scores {
    /// Scores in display order, labelled
    pub fn entries(&self) -> [(&'static str, u8); 5] {
        [
            ("pronunciation", self.pronunciation),
            ("grammar", self.grammar),
            ("relevance", self.relevance),
            ("fluency", self.fluency),
            ("overall", self.overall),
        ]
    }

    pub fn overall_band(&self) -> ScoreBand {
        ScoreBand::from_score(self.overall)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Minor,
    Moderate,
    Major,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrammarNote {
    pub original: String,
    pub correction: String,
    pub explanation: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PronunciationNote {
    pub word: String,
    pub issue: String,
    pub suggestion: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub common_mistake: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelevanceNote {
    pub is_relevant: bool,
    pub analysis: String,
    #[serde(default)]
    pub missing_points: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FluencyNote {
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    #[serde(default)]
    pub grammar: Vec<GrammarNote>,
    #[serde(default)]
    pub pronunciation: Vec<PronunciationNote>,
    pub relevance: RelevanceNote,
    #[serde(default)]
    pub fluency: FluencyNote,
}

impl Feedback {
    /// Most serious grammar problem, if any were found
    pub fn worst_grammar_severity(&self) -> Option<Severity> {
        self.grammar.iter().map(|note| note.severity).max()
    }
}

/// Everything the evaluation service says about one submitted answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    pub transcription: String,
    pub scores: Scores,
    pub feedback: Feedback,
    pub suggested_response: String,
    #[serde(default)]
    pub suggested_response_translation: String,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_scenario: Option<Scenario>,
}

/// Body of a failed remote call
#[derive(Debug, Deserialize)]
pub struct RemoteErrorBody {
    pub error: Option<String>,
}

/// Reply of the transcription endpoint
#[derive(Debug, Deserialize)]
pub struct TranscriptionReply {
    pub text: String,
}
