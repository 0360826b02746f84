//! Pulling a YAML document out of free-form model output

use std::sync::OnceLock;

use regex::Regex;

const FENCED_BLOCK_PATTERN: &str = r"```(?:yaml)?\s*\n([\s\S]*?)\n```";

static FENCED_BLOCK_REGEX: OnceLock<Regex> = OnceLock::new();

fn fenced_block() -> &'static Regex {
    FENCED_BLOCK_REGEX.get_or_init(|| Regex::new(FENCED_BLOCK_PATTERN).expect("invalid regex pattern"))
}

/// Find the composition document in a model reply
///
/// Takes the first fenced code block (optionally tagged `yaml`). Without a
/// fence, a reply that itself starts with `name:` is taken whole.
pub fn extract_yaml_block(response: &str) -> Option<String> {
    if let Some(captures) = fenced_block().captures(response) {
        let body = captures.get(1)?.as_str().trim();
        return (!body.is_empty()).then(|| body.to_string());
    }

    let trimmed = response.trim();
    trimmed.starts_with("name:").then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("Here you go:\n```yaml\nname: Dawn\nduration: 60\n```\nEnjoy!" => Some("name: Dawn\nduration: 60".to_string()) ; "tagged fence")]
    #[test_case("```\nname: Dawn\n```" => Some("name: Dawn".to_string()) ; "untagged fence")]
    #[test_case("name: Dawn\nduration: 60\n" => Some("name: Dawn\nduration: 60".to_string()) ; "bare document")]
    #[test_case("I cannot help with that." => None ; "no document")]
    #[test_case("```yaml\n\n```" => None ; "empty fence")]
    fn test_extract(response: &str) -> Option<String> {
        extract_yaml_block(response)
    }

    #[test]
    fn test_first_block_wins() {
        let response = "```yaml\nname: A\n```\n```yaml\nname: B\n```";
        assert_eq!(extract_yaml_block(response).as_deref(), Some("name: A"));
    }
}
