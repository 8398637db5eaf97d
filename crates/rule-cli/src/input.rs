use std::collections::HashSet;
use std::path::Path;

use rule_types::{Fact, Rule};
use serde::{Deserialize, Serialize};

use crate::error::{CliError, CliResult};

/// The on-disk JSON shape of a single `(attribute, value)` pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactInput {
    attribute: String,
    value: String,
}

impl FactInput {
    fn into_fact(self) -> CliResult<Fact> {
        Ok(Fact::new(self.attribute, self.value)?)
    }
}

/// The on-disk JSON shape of a single rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleInput {
    id: i64,
    premises: Vec<FactInput>,
    conclusion: FactInput,
}

impl RuleInput {
    fn into_rule(self) -> CliResult<Rule> {
        let premises = self
            .premises
            .into_iter()
            .map(FactInput::into_fact)
            .collect::<CliResult<Vec<_>>>()?;
        let conclusion = self.conclusion.into_fact()?;
        Ok(Rule::new(self.id, premises, conclusion)?)
    }
}

/// The on-disk JSON shape of a complete knowledge base: an initial fact set
/// plus the rule list to load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeBaseInput {
    facts: Vec<FactInput>,
    rules: Vec<RuleInput>,
}

/// Reads and validates a knowledge base from a JSON file at `path`.
///
/// # Errors
///
/// Returns [`CliError::Io`] if the file cannot be read, [`CliError::Serialization`]
/// if it is not valid JSON for this shape, or [`CliError::Type`] if any fact
/// or rule it describes fails construction (e.g. an empty attribute).
pub fn load_knowledge_base(path: &Path) -> CliResult<(Vec<Rule>, HashSet<Fact>)> {
    let raw = std::fs::read_to_string(path).map_err(|e| CliError::io(path, e))?;
    let input: KnowledgeBaseInput = serde_json::from_str(&raw)?;

    let facts = input
        .facts
        .into_iter()
        .map(FactInput::into_fact)
        .collect::<CliResult<HashSet<_>>>()?;
    let rules = input
        .rules
        .into_iter()
        .map(RuleInput::into_rule)
        .collect::<CliResult<Vec<_>>>()?;

    Ok((rules, facts))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_a_minimal_knowledge_base() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kb.json");
        std::fs::write(
            &path,
            r#"{
                "facts": [{"attribute": "a", "value": "1"}],
                "rules": [
                    {
                        "id": 1,
                        "premises": [{"attribute": "a", "value": "1"}],
                        "conclusion": {"attribute": "b", "value": "2"}
                    }
                ]
            }"#,
        )
        .unwrap();

        let (rules, facts) = load_knowledge_base(&path).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(facts.len(), 1);
    }

    #[test]
    fn rejects_rule_with_empty_attribute() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kb.json");
        std::fs::write(
            &path,
            r#"{
                "facts": [],
                "rules": [
                    {
                        "id": 1,
                        "premises": [{"attribute": "", "value": "1"}],
                        "conclusion": {"attribute": "b", "value": "2"}
                    }
                ]
            }"#,
        )
        .unwrap();

        assert!(load_knowledge_base(&path).is_err());
    }

    #[test]
    fn missing_file_reports_io_error() {
        let err = load_knowledge_base(Path::new("/nonexistent/kb.json")).unwrap_err();
        assert!(matches!(err, CliError::Io { .. }));
    }
}
