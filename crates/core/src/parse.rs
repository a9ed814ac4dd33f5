//! Tolerant parsers for free-form model output.
//!
//! The producer on the other side is not schema-constrained, so every
//! parser here resolves to a documented fallback value instead of
//! failing: a parse failure is logged as a warning and absorbed, never
//! raised past this module's boundary.

use serde_json::Value;

/// The designated fallback tool, used whenever analysis parsing fails
/// or the model picks a tool that isn't in the catalog.
pub const DEFAULT_TOOL: &str = "search";

/// The most tasks a single decomposition may yield.
const MAX_TASKS: usize = 5;

/// The chosen tool, its argument, and the rationale for one task.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Analysis {
    /// The tool identifier to execute the task with.
    pub action: String,
    /// Explanatory text for the choice.
    pub reasoning: String,
    /// The argument to pass to the tool.
    pub arg: String,
}

impl Analysis {
    /// The well-defined default used whenever parsing fails: the
    /// fallback tool with the original task as its argument.
    pub fn fallback(task: &str) -> Self {
        Self {
            action: DEFAULT_TOOL.to_owned(),
            reasoning: "Fallback analysis: research the task with a web \
                        search."
                .to_owned(),
            arg: task.to_owned(),
        }
    }
}

/// Parses a goal decomposition response into a bounded list of tasks.
///
/// Three tiers, in order: lines starting with a digit followed by
/// `.`, `)` or `:` (marker stripped); lines starting with a digit
/// followed by a space (split on the first space); and, when neither
/// recovers anything, every non-blank line as one task. The result is
/// capped at 5 tasks.
pub fn task_list(text: &str) -> Vec<String> {
    let mut tasks = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if starts_with_numeric_marker(line) {
            let task = line[2..].trim();
            if !task.is_empty() {
                tasks.push(task.to_owned());
            }
        } else if line.starts_with(|c: char| c.is_ascii_digit()) {
            // A bare number without punctuation; take whatever follows
            // the first space.
            if let Some((_, task)) = line.split_once(' ') {
                let task = task.trim();
                if !task.is_empty() {
                    tasks.push(task.to_owned());
                }
            }
        }
    }

    if tasks.is_empty() {
        warn!("no numbered tasks recovered, splitting on non-blank lines");
        tasks = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(ToOwned::to_owned)
            .collect();
    }

    tasks.truncate(MAX_TASKS);
    tasks
}

/// Parses a task analysis response into an [`Analysis`].
///
/// The substring between the first `{` and the last `}` is decoded as
/// a JSON object. A missing key falls back on its own (the default
/// tool, a fixed reasoning notice, the original task as argument); a
/// decode failure or a non-object payload yields
/// [`Analysis::fallback`]. A tool that isn't in `tools` is replaced by
/// the default tool.
pub fn analysis(text: &str, task: &str, tools: &[String]) -> Analysis {
    let Some(object) = extract_json_object(text) else {
        warn!("analysis response carried no JSON object, using fallback");
        return Analysis::fallback(task);
    };

    let action = match object.get("tool").and_then(Value::as_str) {
        Some(tool) if known_tool(tool, tools) => tool,
        Some(tool) => {
            warn!("model chose unknown tool {tool:?}, using {DEFAULT_TOOL}");
            DEFAULT_TOOL
        }
        None => DEFAULT_TOOL,
    };
    let reasoning = object
        .get("reasoning")
        .and_then(Value::as_str)
        .unwrap_or("No reasoning provided");
    let arg = object.get("arg").and_then(Value::as_str).unwrap_or(task);

    Analysis {
        action: action.to_owned(),
        reasoning: reasoning.to_owned(),
        arg: arg.to_owned(),
    }
}

/// Cleans a next-task proposal into zero or one task.
///
/// A single leading bullet (`-`, `•`, `*`) or numeric marker is
/// stripped. A cleaned proposal that exactly matches an existing
/// current or completed task is a duplicate and yields `None`, which
/// is the valid "goal locally exhausted" outcome, not an error.
pub fn next_task(
    text: &str,
    current_tasks: &[String],
    completed_tasks: &[String],
) -> Option<String> {
    let mut task = text.trim();
    // The marker alone (a bare `-`) must clean down to nothing, so the
    // space after it is trimmed rather than matched.
    for marker in ["-", "•", "*"] {
        if let Some(rest) = task.strip_prefix(marker) {
            task = rest.trim();
            break;
        }
    }
    if starts_with_numeric_marker(task) {
        task = task[2..].trim();
    }

    if task.is_empty() {
        warn!("next-task proposal was empty after cleaning");
        return None;
    }
    if current_tasks.iter().any(|t| t == task)
        || completed_tasks.iter().any(|t| t == task)
    {
        debug!("next-task proposal {task:?} duplicates an existing task");
        return None;
    }
    Some(task.to_owned())
}

/// A line like `1. ...`, `2) ...` or `3: ...`. Both marker characters
/// are ASCII, so slicing the line at byte 2 afterwards is safe.
fn starts_with_numeric_marker(line: &str) -> bool {
    let mut chars = line.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some(first), Some('.' | ')' | ':')) if first.is_ascii_digit()
    )
}

fn known_tool(tool: &str, tools: &[String]) -> bool {
    tool == DEFAULT_TOOL || tools.iter().any(|t| t == tool)
}

fn extract_json_object(text: &str) -> Option<serde_json::Map<String, Value>> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    match serde_json::from_str(&text[start..=end]) {
        Ok(Value::Object(object)) => Some(object),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_task_list_numbered() {
        let tasks = task_list(
            "1. Book a venue\n2. Order a cake\n3. Send invitations",
        );
        assert_eq!(
            tasks,
            owned(&["Book a venue", "Order a cake", "Send invitations"])
        );
    }

    #[test]
    fn test_task_list_marker_styles() {
        let tasks = task_list("1) First\n2: Second\n3. Third");
        assert_eq!(tasks, owned(&["First", "Second", "Third"]));
    }

    #[test]
    fn test_task_list_bare_numbers() {
        let tasks = task_list("1 Research venues\n2 Compare prices");
        assert_eq!(tasks, owned(&["Research venues", "Compare prices"]));
    }

    #[test]
    fn test_task_list_non_blank_fallback() {
        let tasks = task_list("Book a venue\n\nOrder a cake\n");
        assert_eq!(tasks, owned(&["Book a venue", "Order a cake"]));
    }

    #[test]
    fn test_task_list_caps_at_five() {
        let tasks = task_list("1. a\n2. b\n3. c\n4. d\n5. e\n6. f\n7. g");
        assert_eq!(tasks.len(), 5);
        assert_eq!(tasks[4], "e");
    }

    #[test]
    fn test_task_list_fallback_caps_at_five() {
        let tasks = task_list("a\nb\nc\nd\ne\nf");
        assert_eq!(tasks, owned(&["a", "b", "c", "d", "e"]));
    }

    #[test]
    fn test_task_list_blank_text() {
        assert!(task_list("\n  \n").is_empty());
    }

    #[test]
    fn test_analysis_embedded_in_prose() {
        let tools = owned(&["search", "code"]);
        let parsed = analysis(
            "Here is my answer: {\"tool\": \"search\", \"reasoning\": \
             \"need facts\", \"arg\": \"birthday venues nearby\"}",
            "Find a venue",
            &tools,
        );
        assert_eq!(
            parsed,
            Analysis {
                action: "search".to_owned(),
                reasoning: "need facts".to_owned(),
                arg: "birthday venues nearby".to_owned(),
            }
        );
    }

    #[test]
    fn test_analysis_missing_keys_fall_back_individually() {
        let tools = owned(&["search"]);
        let parsed = analysis("{\"tool\": \"search\"}", "the task", &tools);
        assert_eq!(parsed.action, "search");
        assert_eq!(parsed.reasoning, "No reasoning provided");
        assert_eq!(parsed.arg, "the task");
    }

    #[test]
    fn test_analysis_unknown_tool_uses_default() {
        let tools = owned(&["code"]);
        let parsed = analysis(
            "{\"tool\": \"teleport\", \"reasoning\": \"magic\", \
             \"arg\": \"x\"}",
            "the task",
            &tools,
        );
        assert_eq!(parsed.action, DEFAULT_TOOL);
        assert_eq!(parsed.reasoning, "magic");
    }

    #[test]
    fn test_analysis_malformed_uses_fallback() {
        let tools = owned(&["search"]);
        let parsed = analysis("not json at all", "the task", &tools);
        assert_eq!(parsed, Analysis::fallback("the task"));
        assert_eq!(parsed.action, DEFAULT_TOOL);
        assert_eq!(parsed.arg, "the task");
    }

    #[test]
    fn test_analysis_non_object_json_uses_fallback() {
        let tools = owned(&["search"]);
        let parsed = analysis("{\"tool\": \"search\"} }", "t", &tools);
        // The first-`{`-to-last-`}` span is not valid JSON here.
        assert_eq!(parsed, Analysis::fallback("t"));
    }

    #[test]
    fn test_next_task_strips_bullet() {
        let proposed = next_task("- Hire a photographer", &[], &[]);
        assert_eq!(proposed.as_deref(), Some("Hire a photographer"));
    }

    #[test]
    fn test_next_task_strips_unicode_bullet_and_number() {
        assert_eq!(
            next_task("• Hire a band", &[], &[]).as_deref(),
            Some("Hire a band")
        );
        assert_eq!(
            next_task("1. Hire a band", &[], &[]).as_deref(),
            Some("Hire a band")
        );
    }

    #[test]
    fn test_next_task_duplicate_returns_none() {
        let completed = owned(&["Order a cake"]);
        assert_eq!(next_task("- Order a cake", &[], &completed), None);

        let current = owned(&["Order a cake"]);
        assert_eq!(next_task("Order a cake", &current, &[]), None);
    }

    #[test]
    fn test_next_task_no_normalization() {
        // Duplicate detection is exact string match only.
        let completed = owned(&["Order a cake"]);
        assert_eq!(
            next_task("order a cake", &[], &completed).as_deref(),
            Some("order a cake")
        );
    }

    #[test]
    fn test_next_task_empty_returns_none() {
        assert_eq!(next_task("   ", &[], &[]), None);
        assert_eq!(next_task("- ", &[], &[]), None);
        assert_eq!(next_task("-", &[], &[]), None);
        assert_eq!(next_task(" • ", &[], &[]), None);
        assert_eq!(next_task("*", &[], &[]), None);
    }
}
