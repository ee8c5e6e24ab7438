use crate::context::DocumentContext;

const GENERATE_SCENARIOS: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/generate_scenarios.md"
));

pub(crate) const NO_DOCUMENTATION: &str = "(no documentation available)";

/// Inputs of a single generation prompt.
#[derive(Debug, Clone, Copy)]
pub struct PromptInputs<'a> {
    pub target: &'a str,
    pub count: usize,
    pub test_type: &'a str,
    pub env_hint: Option<&'a str>,
}

/// Render the generation prompt for `inputs` grounded in `context`.
pub fn build_prompt(inputs: &PromptInputs<'_>, context: &DocumentContext) -> String {
    let env_hint = inputs
        .env_hint
        .map(str::trim)
        .filter(|hint| !hint.is_empty())
        .map(|hint| format!("- Environment notes: {hint}"))
        .unwrap_or_default();

    let count = inputs.count.to_string();
    let test_type_description = describe_test_type(inputs.test_type, inputs.target);
    let context = build_context_block(context);
    render(
        GENERATE_SCENARIOS,
        &[
            ("count", count.as_str()),
            ("target", inputs.target),
            ("test_type_description", test_type_description.as_str()),
            ("test_type", inputs.test_type),
            ("env_hint", env_hint.as_str()),
            ("context", context.as_str()),
        ],
    )
}

/// Substitute `{name}` placeholders in one left-to-right pass; inserted
/// values are never rescanned. Braces that do not name a known placeholder
/// are copied through.
fn render(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let value = after.find('}').and_then(|close| {
            let name = &after[..close];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, close))
        });
        match value {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// One `=== NAME ===` section per source, in key order.
pub fn build_context_block(context: &DocumentContext) -> String {
    if context.is_empty() {
        return NO_DOCUMENTATION.to_string();
    }
    context
        .iter()
        .map(|(name, text)| format!("=== {} ===\n{}", name.to_uppercase(), text.trim_end()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn describe_test_type(test_type: &str, target: &str) -> String {
    match test_type {
        "syscall" => format!("Linux system call invoked directly through `{target}(2)`"),
        "libc" => "C library function exercised through its documented interface".to_string(),
        "ioctl" => "device ioctl request issued on an open file descriptor".to_string(),
        other => format!("{other} entry point"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(target: &str) -> PromptInputs<'_> {
        PromptInputs {
            target,
            count: 2,
            test_type: "syscall",
            env_hint: None,
        }
    }

    fn open_context() -> DocumentContext {
        let mut context = DocumentContext::new();
        context.insert(
            "manpages".to_string(),
            "NAME\nopen - open file\n...".to_string(),
        );
        context
    }

    fn section<'a>(prompt: &'a str, start: &str, end: &str) -> &'a str {
        let from = prompt.find(start).expect("section start");
        let to = prompt[from..].find(end).expect("section end") + from;
        &prompt[from..to]
    }

    #[test]
    fn embeds_context_block_and_target() {
        let prompt = build_prompt(&inputs("open"), &open_context());
        assert!(prompt.contains("=== MANPAGES ===\nNAME\nopen - open file\n..."));
        assert!(prompt.contains("Generate 2 black-box test scenarios for `open`"));
        assert!(prompt.contains("exactly 2 objects"));
        for placeholder in ["{target}", "{count}", "{context}", "{test_type}", "{env_hint}"] {
            assert!(!prompt.contains(placeholder), "unreplaced {placeholder}");
        }
    }

    #[test]
    fn required_field_instructions_name_target_twice() {
        let prompt = build_prompt(&inputs("open"), &open_context());
        let fields = section(&prompt, "# Output Format", "# Examples");
        assert_eq!(fields.matches("\"open\"").count(), 2);
        for field in [
            "\"id\"",
            "\"description\"",
            "\"test_type\"",
            "\"target\"",
            "\"params\"",
            "\"expected_result\"",
            "\"expected_errno\"",
        ] {
            assert!(fields.contains(field), "missing {field}");
        }
    }

    #[test]
    fn states_environment_constraints() {
        let prompt = build_prompt(&inputs("open"), &open_context());
        let constraints = section(&prompt, "# Environment Constraints", "# Output Format");
        assert!(constraints.contains("/tmp/delphos/"));
        assert!(constraints.contains("read-only"));
        assert!(constraints.contains("O_CREAT"));
        assert!(constraints.contains("must call `open` itself"));
    }

    #[test]
    fn env_hint_text_is_not_expanded() {
        let prompt = build_prompt(
            &PromptInputs {
                env_hint: Some("see {context} and {count}"),
                ..inputs("open")
            },
            &open_context(),
        );
        assert!(prompt.contains("- Environment notes: see {context} and {count}"));
        assert_eq!(prompt.matches("=== MANPAGES ===").count(), 1);
    }

    #[test]
    fn render_copies_unknown_braces() {
        let out = render(
            "{\"id\": \"{name}\"} {missing} {name",
            &[("name", "open {name}")],
        );
        assert_eq!(out, "{\"id\": \"open {name}\"} {missing} {name");
    }

    #[test]
    fn empty_context_uses_placeholder() {
        let prompt = build_prompt(&inputs("close"), &DocumentContext::new());
        assert!(prompt.contains(NO_DOCUMENTATION));
        assert_eq!(build_context_block(&DocumentContext::new()), NO_DOCUMENTATION);
    }

    #[test]
    fn context_sections_follow_source_order() {
        let mut context = open_context();
        context.insert("cve_db".to_string(), "CVE-1: race".to_string());
        let block = build_context_block(&context);
        assert_eq!(
            block,
            "=== CVE_DB ===\nCVE-1: race\n\n=== MANPAGES ===\nNAME\nopen - open file\n..."
        );
    }

    #[test]
    fn env_hint_is_included_when_present() {
        let mut with_hint = inputs("open");
        with_hint.env_hint = Some("running inside a container with /tmp on tmpfs");
        let prompt = build_prompt(&with_hint, &open_context());
        assert!(prompt.contains("- Environment notes: running inside a container"));

        let prompt = build_prompt(&inputs("open"), &open_context());
        assert!(!prompt.contains("Environment notes"));
    }

    #[test]
    fn unknown_test_type_is_described_generically() {
        assert_eq!(describe_test_type("vdso", "gettimeofday"), "vdso entry point");
    }
}
