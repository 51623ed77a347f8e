//! Pulling a PTC-Lisp program out of the LLM's raw text response.
//!
//! Two forms are accepted: a fenced ```` ```clojure ```` / ```` ```lisp ````
//! code block, or a bare response that is itself an s-expression.

fn extract_fenced(raw: &str, tag: &str) -> Option<String> {
    let marker = format!("```{tag}");
    let start = raw.find(&marker)? + marker.len();
    let rest = &raw[start..];
    let end = rest.find("```")?;
    Some(rest[..end].trim().to_string())
}

/// Returns the program text to run, or `None` if the response contains
/// neither a recognised fenced block nor a top-level s-expression.
pub fn extract_program(raw: &str) -> Option<String> {
    if let Some(code) = extract_fenced(raw, "clojure").or_else(|| extract_fenced(raw, "lisp")) {
        if !code.is_empty() {
            return Some(code);
        }
    }
    let trimmed = raw.trim();
    if trimmed.starts_with('(') {
        return Some(trimmed.to_string());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_a_fenced_clojure_block() {
        let raw = "Here's my program:\n```clojure\n(+ 1 2)\n```\nDone.";
        assert_eq!(extract_program(raw), Some("(+ 1 2)".to_string()));
    }

    #[test]
    fn extracts_a_fenced_lisp_block() {
        let raw = "```lisp\n(return 1)\n```";
        assert_eq!(extract_program(raw), Some("(return 1)".to_string()));
    }

    #[test]
    fn accepts_a_bare_s_expression() {
        assert_eq!(extract_program("  (return 1)  "), Some("(return 1)".to_string()));
    }

    #[test]
    fn rejects_prose_with_no_program() {
        assert_eq!(extract_program("I'm not sure what to do next."), None);
    }
}
