//! Request validation performed before anything reaches the pipeline.

use crate::error::ScytheError;

/// Validate and normalize a branch name.
///
/// Returns the trimmed branch or a `MalformedRequest` error when the
/// result is empty.
pub fn check_branch(branch: &str) -> Result<String, ScytheError> {
    let trimmed = branch.trim();
    if trimmed.is_empty() {
        return Err(ScytheError::malformed("Branch name is empty"));
    }
    Ok(trimmed.to_string())
}
