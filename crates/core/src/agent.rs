mod builder;

use std::sync::Arc;

use taskloom_model::CompletionRequest;
use tokio::sync::mpsc;
use tracing::Instrument;

use crate::gateway_client::GatewayClient;
use crate::parse::{self, Analysis, DEFAULT_TOOL};
use crate::relay::{self, OutwardEvent};
use crate::tool::{CredentialStore, ToolRegistry, UserContext};
use crate::{prompt, tool};
pub use builder::AgentBuilder;

/// The task used when goal decomposition yields nothing usable.
const FALLBACK_TASK: &str = "Research information about the goal";

/// Per-phase request limits and shared sampling settings.
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// Token cap for the goal decomposition phase.
    pub decompose_max_tokens: u32,
    /// Token cap for the task analysis phase.
    pub analyze_max_tokens: u32,
    /// Token cap for the task execution phase.
    pub execute_max_tokens: u32,
    /// Token cap for the summarize and chat phases.
    pub summarize_max_tokens: u32,
    /// Token cap for the next-task proposal phase.
    pub next_task_max_tokens: u32,
    /// Sampling temperature for every phase.
    pub temperature: f32,
    /// Buffer size for outward event channels.
    pub channel_capacity: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            decompose_max_tokens: 500,
            analyze_max_tokens: 500,
            execute_max_tokens: 1000,
            summarize_max_tokens: 1000,
            next_task_max_tokens: 200,
            temperature: 0.9,
            channel_capacity: 32,
        }
    }
}

/// An agent instance, which drives one goal through its phases:
/// decomposing the goal into tasks, analyzing each task to pick a
/// tool, executing it, proposing follow-up tasks, and summarizing
/// the results.
///
/// The agent itself keeps no run state; callers own the task lists
/// and results and pass them back in, so one agent can serve many
/// concurrent runs.
#[derive(Clone)]
pub struct Agent {
    gateway: GatewayClient,
    registry: Arc<dyn ToolRegistry>,
    credentials: Arc<dyn CredentialStore>,
    user: UserContext,
    tools: Vec<String>,
    config: AgentConfig,
}

impl Agent {
    /// Decomposes a goal into an initial bounded task list.
    ///
    /// This phase never fails: a gateway error or an empty parse
    /// resolves to a single fallback research task.
    pub async fn start_goal(&self, goal: &str) -> Vec<String> {
        let req = self.single_shot(
            prompt::goal_decomposition(goal),
            self.config.decompose_max_tokens,
        );
        let tasks = match self.gateway.complete_text(req).await {
            Ok(completion) => parse::task_list(&completion.text),
            Err(err) => {
                error!("goal decomposition failed: {err}");
                Vec::new()
            }
        };
        if tasks.is_empty() {
            warn!("no tasks recovered, starting with the fallback task");
            return vec![FALLBACK_TASK.to_owned()];
        }
        info!("decomposed goal into {} tasks", tasks.len());
        tasks
    }

    /// Analyzes a task against the user's tool catalog and picks a
    /// tool, an argument, and the reasoning.
    ///
    /// This phase never fails either: any gateway or parse problem
    /// resolves to the fallback analysis.
    pub async fn analyze_task(&self, goal: &str, task: &str) -> Analysis {
        let catalog = self
            .registry
            .resolve_tools(&self.tools, &self.user, self.credentials.as_ref())
            .await;
        let mut tool_names: Vec<String> =
            catalog.into_iter().map(|tool| tool.name).collect();
        // The fallback tool is always offered, even when the registry
        // doesn't carry it.
        if !tool_names.iter().any(|name| name == DEFAULT_TOOL) {
            tool_names.push(DEFAULT_TOOL.to_owned());
        }

        let req = self.single_shot(
            prompt::task_analysis(goal, task, &tool_names),
            self.config.analyze_max_tokens,
        );
        match self.gateway.complete_text(req).await {
            Ok(completion) => {
                parse::analysis(&completion.text, task, &tool_names)
            }
            Err(err) => {
                error!("task analysis failed: {err}");
                Analysis::fallback(task)
            }
        }
    }

    /// Executes an analyzed task and relays the result as a paced
    /// outward stream.
    ///
    /// The returned channel always yields zero or more content events
    /// followed by exactly one stop event; a gateway failure becomes
    /// a stop event carrying the error notice.
    pub fn execute_task(
        &self,
        goal: &str,
        task: &str,
        analysis: &Analysis,
    ) -> mpsc::Receiver<OutwardEvent> {
        let req = self.single_shot(
            prompt::task_execution(
                goal,
                task,
                &self.registry.display_name(&analysis.action),
                &analysis.arg,
            ),
            self.config.execute_max_tokens,
        );
        let (tx, rx) = mpsc::channel(self.config.channel_capacity);
        let gateway = self.gateway.clone();
        tokio::spawn(
            async move {
                match gateway.complete_text(req).await {
                    Ok(completion) => {
                        relay::relay_text(&completion.text, &tx).await;
                    }
                    Err(err) => {
                        error!("task execution failed: {err}");
                        let _ = tx
                            .send(OutwardEvent::stop_with_error(format!(
                                "Error: {err}"
                            )))
                            .await;
                    }
                }
            }
            .instrument(info_span!("execute task")),
        );
        rx
    }

    /// Proposes at most one follow-up task from the latest result.
    ///
    /// `None` means the goal is locally exhausted: the model proposed
    /// nothing new, or the proposal duplicated an existing task, or
    /// the gateway failed.
    pub async fn propose_next_task(
        &self,
        goal: &str,
        completed_tasks: &[String],
        current_tasks: &[String],
        last_task: &str,
        last_result: &str,
    ) -> Option<String> {
        let req = self.single_shot(
            prompt::next_task(
                goal,
                completed_tasks,
                current_tasks,
                last_task,
                last_result,
            ),
            self.config.next_task_max_tokens,
        );
        match self.gateway.complete_text(req).await {
            Ok(completion) => parse::next_task(
                &completion.text,
                current_tasks,
                completed_tasks,
            ),
            Err(err) => {
                error!("next-task proposal failed: {err}");
                None
            }
        }
    }

    /// Summarizes all task results as a live outward stream.
    pub fn summarize(
        &self,
        goal: &str,
        results: &[String],
    ) -> mpsc::Receiver<OutwardEvent> {
        self.stream_phase(
            prompt::summary(goal, results),
            self.config.summarize_max_tokens,
        )
    }

    /// Answers a free-form user message with prior results as context,
    /// as a live outward stream.
    pub fn chat(
        &self,
        message: &str,
        results: &[String],
    ) -> mpsc::Receiver<OutwardEvent> {
        self.stream_phase(
            prompt::chat(message, results),
            self.config.summarize_max_tokens,
        )
    }

    /// Runs one streaming phase: opens a gateway stream for the
    /// prompt and relays its fragments outward.
    fn stream_phase(
        &self,
        prompt: String,
        max_tokens: u32,
    ) -> mpsc::Receiver<OutwardEvent> {
        let req = CompletionRequest::streaming(prompt, max_tokens)
            .with_temperature(self.config.temperature);
        let (tx, rx) = mpsc::channel(self.config.channel_capacity);
        let gateway = self.gateway.clone();
        tokio::spawn(
            async move {
                match gateway.open_stream(req).await {
                    Ok(fragments) => {
                        relay::relay_fragments(fragments, &tx).await;
                    }
                    Err(err) => {
                        error!("streaming phase failed: {err}");
                        let _ = tx
                            .send(OutwardEvent::stop_with_error(format!(
                                "Error: {err}"
                            )))
                            .await;
                    }
                }
            }
            .instrument(info_span!("streaming phase")),
        );
        rx
    }

    fn single_shot(&self, prompt: String, max_tokens: u32) -> CompletionRequest {
        CompletionRequest::single_shot(prompt, max_tokens)
            .with_temperature(self.config.temperature)
    }
}

impl Agent {
    fn from_builder(builder: AgentBuilder) -> Self {
        let AgentBuilder {
            gateway,
            registry,
            credentials,
            user,
            tools,
            config,
        } = builder;

        Self {
            gateway,
            registry: registry
                .unwrap_or_else(|| Arc::new(tool::StaticToolRegistry::default())),
            credentials: credentials.unwrap_or_else(|| Arc::new(tool::NoCredentials)),
            user: user.unwrap_or_default(),
            tools: if tools.is_empty() {
                vec![DEFAULT_TOOL.to_owned()]
            } else {
                tools
            },
            config: config.unwrap_or_default(),
        }
    }
}
