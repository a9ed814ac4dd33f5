use std::collections::VecDeque;

use taskloom_core::parse::Analysis;
use taskloom_core::relay::OutwardEvent;
use taskloom_core::tool::{CredentialStore, ToolRegistry, UserContext};
use taskloom_core::{Agent, AgentBuilder, AgentConfig};
use taskloom_model::CompletionGateway;

/// How many tasks a run executes before it stops proposing more.
const DEFAULT_MAX_STEPS: usize = 5;

/// A progress event emitted while a goal run is in flight.
#[derive(Clone, Debug)]
pub enum RunEvent {
    /// The goal has been decomposed into the initial task list.
    GoalDecomposed(Vec<String>),
    /// A task is about to execute with the given analysis.
    TaskStarted {
        /// The task being executed.
        task: String,
        /// The tool choice and argument for it.
        analysis: Analysis,
    },
    /// One outward event from the executing task's stream.
    TaskOutput(OutwardEvent),
    /// A follow-up task has been accepted into the queue.
    TaskProposed(String),
    /// One outward event from the final summary stream.
    SummaryOutput(OutwardEvent),
}

/// What a finished goal run produced.
#[derive(Clone, Debug, Default)]
pub struct RunReport {
    /// The executed tasks, in completion order.
    pub completed_tasks: Vec<String>,
    /// One result text per completed task.
    pub results: Vec<String>,
    /// Tasks still queued when the step budget ran out.
    pub remaining_tasks: Vec<String>,
}

/// A goal run builder.
///
/// See [`GoalRun`].
pub struct GoalRunBuilder {
    agent_builder: AgentBuilder,
    max_steps: usize,
}

impl GoalRunBuilder {
    /// Creates a goal run builder with a specified completion gateway.
    pub fn with_gateway<G: CompletionGateway + 'static>(gateway: G) -> Self {
        Self {
            agent_builder: AgentBuilder::with_gateway(gateway),
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    /// Limits how many tasks the run may execute.
    #[inline]
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Attaches a tool registry for the analysis phase.
    #[inline]
    pub fn with_tool_registry<R: ToolRegistry + 'static>(
        mut self,
        registry: R,
    ) -> Self {
        self.agent_builder = self.agent_builder.with_tool_registry(registry);
        self
    }

    /// Attaches a credential store for the tool registry.
    #[inline]
    pub fn with_credential_store<C: CredentialStore + 'static>(
        mut self,
        credentials: C,
    ) -> Self {
        self.agent_builder =
            self.agent_builder.with_credential_store(credentials);
        self
    }

    /// Sets the user the run is performed on behalf of.
    #[inline]
    pub fn with_user(mut self, user: UserContext) -> Self {
        self.agent_builder = self.agent_builder.with_user(user);
        self
    }

    /// Overrides the agent's per-phase limits.
    #[inline]
    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.agent_builder = self.agent_builder.with_config(config);
        self
    }

    /// Builds the goal run driver.
    pub fn build(self) -> GoalRun {
        GoalRun {
            agent: self.agent_builder.build(),
            max_steps: self.max_steps,
        }
    }
}

/// Drives one goal end to end: decompose, then analyze, execute and
/// extend the task queue until it drains or the step budget runs out,
/// and finally summarize.
pub struct GoalRun {
    agent: Agent,
    max_steps: usize,
}

impl GoalRun {
    /// Runs the goal to completion, reporting progress through
    /// `on_event`.
    ///
    /// The run itself never fails; phase failures surface as stop
    /// events carrying an error notice, exactly as they would on the
    /// wire, and the run moves on to the next task.
    pub async fn run(
        &self,
        goal: &str,
        mut on_event: impl FnMut(RunEvent),
    ) -> RunReport {
        let mut queue: VecDeque<String> =
            self.agent.start_goal(goal).await.into();
        on_event(RunEvent::GoalDecomposed(queue.iter().cloned().collect()));

        let mut report = RunReport::default();
        while let Some(task) = queue.pop_front() {
            if report.completed_tasks.len() >= self.max_steps {
                debug!("step budget reached with {} tasks left", queue.len() + 1);
                report.remaining_tasks.push(task);
                report.remaining_tasks.extend(queue);
                break;
            }

            let analysis = self.agent.analyze_task(goal, &task).await;
            on_event(RunEvent::TaskStarted {
                task: task.clone(),
                analysis: analysis.clone(),
            });

            let mut rx = self.agent.execute_task(goal, &task, &analysis);
            let mut result = String::new();
            while let Some(event) = rx.recv().await {
                if !event.stop {
                    result.push_str(&event.content);
                }
                on_event(RunEvent::TaskOutput(event));
            }

            report.completed_tasks.push(task.clone());
            report.results.push(result.clone());

            let current: Vec<String> = queue.iter().cloned().collect();
            if let Some(proposed) = self
                .agent
                .propose_next_task(
                    goal,
                    &report.completed_tasks,
                    &current,
                    &task,
                    &result,
                )
                .await
            {
                on_event(RunEvent::TaskProposed(proposed.clone()));
                queue.push_back(proposed);
            }
        }

        let mut rx = self.agent.summarize(goal, &report.results);
        while let Some(event) = rx.recv().await {
            on_event(RunEvent::SummaryOutput(event));
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use taskloom_test_model::{PresetReply, TestGateway};

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_run_executes_tasks_and_summarizes() {
        let mut gateway = TestGateway::default();
        // Decomposition, then per task: analysis, execution, proposal.
        gateway.add_reply(PresetReply::Completed(
            "1. Book a venue\n2. Order a cake".to_owned(),
        ));
        gateway.add_reply(PresetReply::Completed(
            "{\"tool\": \"search\", \"reasoning\": \"r\", \"arg\": \
             \"venues\"}"
                .to_owned(),
        ));
        gateway.add_reply(PresetReply::Completed("Venue booked".to_owned()));
        gateway.add_reply(PresetReply::Completed(
            "Order a cake".to_owned(), // duplicate, dropped
        ));
        gateway.add_reply(PresetReply::Completed(
            "{\"tool\": \"search\", \"reasoning\": \"r\", \"arg\": \
             \"bakeries\"}"
                .to_owned(),
        ));
        gateway.add_reply(PresetReply::Completed("Cake ordered".to_owned()));
        gateway.add_reply(PresetReply::Completed(
            "Book a venue".to_owned(), // duplicate, dropped
        ));
        gateway.add_reply(PresetReply::Fragments(vec![
            "All ".to_owned(),
            "done.".to_owned(),
        ]));

        let run = GoalRunBuilder::with_gateway(gateway).build();
        let mut events = Vec::new();
        let report = run
            .run("Plan a birthday party", |event| events.push(event))
            .await;

        assert_eq!(
            report.completed_tasks,
            ["Book a venue", "Order a cake"]
        );
        assert_eq!(report.results, ["Venue booked", "Cake ordered"]);
        assert!(report.remaining_tasks.is_empty());

        let summary: String = events
            .iter()
            .filter_map(|event| match event {
                RunEvent::SummaryOutput(out) if !out.stop => {
                    Some(out.content.as_str())
                }
                _ => None,
            })
            .collect();
        assert_eq!(summary, "All done.");
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_honors_step_budget() {
        let mut gateway = TestGateway::default();
        gateway.add_reply(PresetReply::Completed(
            "1. First\n2. Second\n3. Third".to_owned(),
        ));
        gateway.add_reply(PresetReply::Completed(
            "{\"tool\": \"search\", \"reasoning\": \"r\", \"arg\": \"a\"}"
                .to_owned(),
        ));
        gateway.add_reply(PresetReply::Completed("done first".to_owned()));
        // No new proposal.
        gateway.add_reply(PresetReply::Completed("Second".to_owned()));
        gateway.add_reply(PresetReply::Completed("summary".to_owned()));

        let run = GoalRunBuilder::with_gateway(gateway)
            .with_max_steps(1)
            .build();
        let report = run.run("A goal", |_| {}).await;

        assert_eq!(report.completed_tasks, ["First"]);
        assert_eq!(report.remaining_tasks, ["Second", "Third"]);
    }
}
