//! Phase prompt composers.
//!
//! Every function here is pure: it renders the phase inputs into a
//! single prompt string, embedding the caller's literal task and tool
//! text with no truncation. Token budgeting is not a concern of this
//! module; the per-phase caps are applied when the request is built.

/// Composes the goal decomposition prompt, asking for 3-5 actionable
/// tasks as a numbered list and nothing else.
pub fn goal_decomposition(goal: &str) -> String {
    format!(
        "You are an AI task creator. You need to create tasks to achieve \
         the following goal: {goal}\n\
         Please create a list of 3-5 tasks to achieve this goal. The tasks \
         should be concrete and actionable.\n\
         Your response should ONLY include the tasks as a numbered list, \
         with no other text or explanation."
    )
}

/// Composes the task analysis prompt, asking the model to choose one
/// tool from `tool_names` and reply as a JSON object with `reasoning`,
/// `tool` and `arg` fields.
pub fn task_analysis(goal: &str, task: &str, tool_names: &[String]) -> String {
    format!(
        "Goal: {goal}\n\
         Task: {task}\n\n\
         You need to analyze this task and choose the most appropriate \
         tool to complete it.\n\
         Available tools: {}\n\n\
         Your analysis should include:\n\
         1. What needs to be done to complete this task\n\
         2. Which tool is best suited for this task\n\
         3. Why this tool is appropriate\n\n\
         Respond in JSON format with these fields:\n\
         {{\"reasoning\": \"your analysis here\", \"tool\": \
         \"chosen_tool_name\", \"arg\": \"argument for the tool\"}}",
        tool_names.join(", ")
    )
}

/// Composes the task execution prompt for the chosen tool and argument.
pub fn task_execution(goal: &str, task: &str, tool: &str, arg: &str) -> String {
    format!(
        "Goal: {goal}\n\
         Task: {task}\n\
         Using the {tool} tool with argument: {arg}\n\n\
         Execute this task and provide a detailed response with the results."
    )
}

/// Composes the next-task proposal prompt, asking for at most one new,
/// non-duplicate task as plain text with no extra explanation.
pub fn next_task(
    goal: &str,
    completed_tasks: &[String],
    current_tasks: &[String],
    last_task: &str,
    last_result: &str,
) -> String {
    format!(
        "Goal: {goal}\n\
         Completed tasks:\n{}\n\n\
         Current tasks:\n{}\n\n\
         Last completed task: {last_task}\n\
         Result: {last_result}\n\n\
         Based on this information, suggest ONE additional task that would \
         help achieve the goal. The task should be concrete, actionable, \
         and not duplicate any completed or current tasks. Respond with \
         only the task description, no additional explanation.",
        bullet_list(completed_tasks),
        bullet_list(current_tasks),
    )
}

/// Composes the summary prompt relating all task results back to the
/// goal.
pub fn summary(goal: &str, results: &[String]) -> String {
    format!(
        "Goal: {goal}\n\n\
         Results from completed tasks:\n{}\n\n\
         Please provide a comprehensive summary of the results, \
         highlighting the key findings and how they relate to the \
         original goal.",
        results
            .iter()
            .map(|result| format!("- {result}"))
            .collect::<Vec<_>>()
            .join("\n\n"),
    )
}

/// Composes the chat prompt, answering a user message with prior task
/// results as context.
pub fn chat(message: &str, results: &[String]) -> String {
    let context = if results.is_empty() {
        "No previous results.".to_owned()
    } else {
        results.join("\n\n")
    };
    format!(
        "Previous context:\n{context}\n\n\
         User message: {message}\n\n\
         Please respond to the user's message based on the provided context."
    )
}

fn bullet_list(tasks: &[String]) -> String {
    tasks
        .iter()
        .map(|task| format!("- {task}"))
        .collect::<Vec<_>>()
        .join("\n")
}
