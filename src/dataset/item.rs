//! @ai:module:intent Item schemas for the golden and trap corpora
//! @ai:module:layer domain
//! @ai:module:public_api GoldenItem, TrapItem, EvalItem, ItemSchema, ExamVariant, Difficulty
//! @ai:module:stateless true

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// @ai:intent AP Calculus exam variant an item targets
/// @ai:effects pure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExamVariant {
    CalcAb,
    CalcBc,
}

impl ExamVariant {
    pub const ALL: [ExamVariant; 2] = [ExamVariant::CalcAb, ExamVariant::CalcBc];

    /// @ai:intent Convert variant to string representation
    /// @ai:effects pure
    pub fn as_str(&self) -> &'static str {
        match self {
            ExamVariant::CalcAb => "calc_ab",
            ExamVariant::CalcBc => "calc_bc",
        }
    }

    /// @ai:intent Parse a variant from its string representation
    /// @ai:effects pure
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "calc_ab" | "ab" => Some(ExamVariant::CalcAb),
            "calc_bc" | "bc" => Some(ExamVariant::CalcBc),
            _ => None,
        }
    }
}

impl std::fmt::Display for ExamVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// @ai:intent Difficulty level of a golden item
/// @ai:effects pure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    /// @ai:intent Convert difficulty to string representation
    /// @ai:effects pure
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// @ai:intent Reference question with an answer assumed correct
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GoldenItem {
    pub id: String,
    pub exam_variant: ExamVariant,
    pub question: String,
    pub expected_answer: String,
    pub expected_justification: String,
    pub difficulty: Difficulty,
    pub topic: String,
}

/// @ai:intent Adversarial question engineered to provoke one kind of mistake
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrapItem {
    pub id: String,
    pub exam_variant: ExamVariant,
    pub question: String,
    pub expected_answer: String,
    /// Failure mode the trap targets, e.g. "sign-flip"
    pub trap_category: String,
    /// The wrong answer the trap is designed to elicit
    pub trap_answer: String,
    pub description: String,
}

/// @ai:intent View of an item the execution engine needs to query the service
pub trait EvalItem: Send + Sync {
    fn id(&self) -> &str;
    fn exam_variant(&self) -> ExamVariant;
    fn question(&self) -> &str;
    fn expected_answer(&self) -> &str;

    /// @ai:intent Trap category and elicited wrong answer, if this is a trap
    fn trap(&self) -> Option<(&str, &str)> {
        None
    }
}

/// @ai:intent A record shape the dataset loader can parse and validate
pub trait ItemSchema: EvalItem + DeserializeOwned {
    /// Short name used in diagnostics
    const KIND: &'static str;

    /// @ai:intent Check semantic constraints serde cannot express
    /// @ai:effects pure
    fn validate(&self) -> Result<(), String> {
        require_non_empty("id", self.id())?;
        require_non_empty("question", self.question())?;
        require_non_empty("expected_answer", self.expected_answer())
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("field `{}` must not be empty", field))
    } else {
        Ok(())
    }
}

impl EvalItem for GoldenItem {
    fn id(&self) -> &str {
        &self.id
    }

    fn exam_variant(&self) -> ExamVariant {
        self.exam_variant
    }

    fn question(&self) -> &str {
        &self.question
    }

    fn expected_answer(&self) -> &str {
        &self.expected_answer
    }
}

impl ItemSchema for GoldenItem {
    const KIND: &'static str = "golden";
}

impl EvalItem for TrapItem {
    fn id(&self) -> &str {
        &self.id
    }

    fn exam_variant(&self) -> ExamVariant {
        self.exam_variant
    }

    fn question(&self) -> &str {
        &self.question
    }

    fn expected_answer(&self) -> &str {
        &self.expected_answer
    }

    fn trap(&self) -> Option<(&str, &str)> {
        Some((self.trap_category.as_str(), self.trap_answer.as_str()))
    }
}

impl ItemSchema for TrapItem {
    const KIND: &'static str = "trap";

    fn validate(&self) -> Result<(), String> {
        require_non_empty("id", &self.id)?;
        require_non_empty("question", &self.question)?;
        require_non_empty("expected_answer", &self.expected_answer)?;
        require_non_empty("trap_category", &self.trap_category)?;
        require_non_empty("trap_answer", &self.trap_answer)
    }
}
