//! Stage option vocabulary.

use serde::{Deserialize, Serialize};

/// Stage names restored by a reset.
pub const DEFAULT_STAGE_OPTIONS: [&str; 3] = ["Анализ", "В разработке", "Выполнено"];

/// An entry in the controlled list of stage names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageOption {
    pub id: i64,
    /// Unique name.
    pub name: String,
}
