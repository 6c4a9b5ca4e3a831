use std::path::Path;

use tracing::info;

use crate::{
    dao::storage::{StorageError, StorageResult},
    state::question::Question,
};

/// Read the raw question records from the JSON array stored at `path`.
///
/// Records are returned in file order; validation happens when the bank is
/// built from them.
pub async fn load_questions(path: &Path) -> StorageResult<Vec<Question>> {
    let contents = tokio::fs::read_to_string(path).await.map_err(|err| {
        StorageError::unavailable(format!("reading {}", path.display()), err)
    })?;

    let questions: Vec<Question> =
        serde_json::from_str(&contents).map_err(|err| StorageError::malformed(path, err))?;

    info!(path = %path.display(), count = questions.len(), "loaded question bank");
    Ok(questions)
}
