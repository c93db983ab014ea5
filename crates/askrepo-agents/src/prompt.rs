//! Prompt augmentation applied to every run.

/// Fixed suffix appended to every prompt before it reaches an agent.
///
/// Runs are question-answering only: the agent must not touch the cached
/// checkout. This is a content-level contract, not negotiable per request.
pub const SAFETY_SUFFIX: &str = "\n\nIMPORTANT: You are answering a question about this repository. \
Do not create, modify, or delete any files, and do not run commands that change state. \
Reply in chat only, formatted as markdown.";

/// Append the safety suffix to a caller-supplied prompt.
pub fn augment(prompt: &str) -> String {
    format!("{prompt}{SAFETY_SUFFIX}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_augment_appends_suffix() {
        let augmented = augment("How does the parser work?");
        assert!(augmented.starts_with("How does the parser work?"));
        assert!(augmented.ends_with(SAFETY_SUFFIX));
    }

    #[test]
    fn test_suffix_forbids_modification() {
        assert!(SAFETY_SUFFIX.contains("Do not create, modify, or delete"));
        assert!(SAFETY_SUFFIX.contains("chat only"));
    }
}
