//! A simple program demonstrates how to use `taskloom` as a library.

#[macro_use]
extern crate tracing;

use std::env;
use std::io::Write as _;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use taskloom::{GoalRunBuilder, RunEvent};
use taskloom_openai_model::{OpenAIConfigBuilder, OpenAIGateway};
use tokio::io::{self, AsyncBufReadExt};

const BAR_CHAR: &str = "▎";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let Ok(api_key) = env::var("OPENAI_API_KEY") else {
        eprintln!("OPENAI_API_KEY environment variable is not set");
        return;
    };

    let mut config = OpenAIConfigBuilder::with_api_key(api_key);
    if let Ok(base_url) = env::var("OPENAI_BASE_URL") {
        config = config.with_base_url(base_url);
    }
    if let Ok(model) = env::var("OPENAI_MODEL") {
        config = config.with_model(model);
    }
    let gateway = OpenAIGateway::new(config.build());

    let goal = match env::args().nth(1) {
        Some(goal) => goal,
        None => {
            print!("Goal: ");
            std::io::stdout().flush().unwrap();
            let Some(line) = read_line().await else {
                return;
            };
            line.trim().to_owned()
        }
    };
    if goal.is_empty() {
        eprintln!("no goal given");
        return;
    }

    let run = GoalRunBuilder::with_gateway(gateway).build();

    let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .unwrap()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(progress_style);
    spinner.set_message("🤔 Thinking...");
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));

    let mut streaming = false;
    let report = run
        .run(&goal, |event| match event {
            RunEvent::GoalDecomposed(tasks) => {
                spinner.suspend(|| {
                    println!("{}📋 Plan:", BAR_CHAR.bright_cyan());
                    for task in &tasks {
                        println!(
                            "{}   • {}",
                            BAR_CHAR.bright_cyan(),
                            task.bright_white()
                        );
                    }
                });
            }
            RunEvent::TaskStarted { task, analysis } => {
                spinner.suspend(|| {
                    println!(
                        "\n{}▶️  {} {}",
                        BAR_CHAR.bright_yellow(),
                        task.bright_white().bold(),
                        format!("({})", analysis.action).dimmed()
                    );
                });
            }
            RunEvent::TaskOutput(out) | RunEvent::SummaryOutput(out) => {
                if !streaming {
                    spinner.disable_steady_tick();
                    streaming = true;
                }
                if out.stop {
                    if !out.content.is_empty() {
                        print!("{}", out.content.bright_red());
                    }
                    println!();
                    streaming = false;
                    spinner
                        .enable_steady_tick(std::time::Duration::from_millis(100));
                } else {
                    print!("{}", out.content.bright_white());
                    std::io::stdout().flush().unwrap();
                }
            }
            RunEvent::TaskProposed(task) => {
                spinner.suspend(|| {
                    println!(
                        "{}➕ {}",
                        BAR_CHAR.bright_green(),
                        task.bright_white()
                    );
                });
            }
        })
        .await;
    spinner.finish_and_clear();

    println!(
        "\n{} tasks completed.",
        report.completed_tasks.len().bright_white().bold()
    );
}

async fn read_line() -> Option<String> {
    let mut stdin = io::BufReader::new(io::stdin());
    let mut line = String::new();

    match stdin.read_line(&mut line).await {
        Ok(count) => {
            if count == 0 {
                return None;
            }
            Some(line)
        }
        Err(err) => {
            error!("error reading input: {}", err);
            None
        }
    }
}
