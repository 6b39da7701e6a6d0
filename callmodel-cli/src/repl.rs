//! REPL (Read-Eval-Print Loop) for interactive and single-request modes.

use std::io::{self, BufRead, Write};

use callmodel_core::{ActionEvent, CallModelConfig, ModelId, Vendor};
use tracing::warn;

use crate::RunOptions;
use crate::client::Backend;
use crate::prompts;
use crate::session::{Answer, History};
use crate::slash::CommandRegistry;

/// Action group name used on every outbound action.
pub const ACTION_GROUP: &str = "call-model";

/// Result of handling one line of input.
#[derive(Debug, Default, PartialEq)]
pub struct Step {
    pub output: String,
    pub quit: bool,
}

impl Step {
    fn say(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            quit: false,
        }
    }
}

/// Model named by a "use model <id>" phrase, if the input has one.
pub fn parse_model_directive(input: &str) -> Option<&str> {
    const PHRASE: &str = "use model ";
    let start = input.to_ascii_lowercase().find(PHRASE)? + PHRASE.len();
    let id = input[start..]
        .split_whitespace()
        .next()?
        .trim_end_matches(['.', ',', ';']);
    (!id.is_empty()).then_some(id)
}

/// Interactive session state.
pub struct Repl {
    backend: Backend,
    history: History,
    model: Option<ModelId>,
    registry: CommandRegistry,
}

impl Repl {
    pub fn new(backend: Backend, model: Option<ModelId>) -> Self {
        Self {
            backend,
            history: History::new(),
            model,
            registry: CommandRegistry::with_defaults(),
        }
    }

    pub fn model(&self) -> Option<&ModelId> {
        self.model.as_ref()
    }

    /// Handle one trimmed, non-empty line.
    pub async fn handle_line(&mut self, input: &str) -> Step {
        if input.starts_with('/') {
            return self.handle_command(input);
        }
        self.submit(input).await
    }

    fn handle_command(&mut self, input: &str) -> Step {
        let (cmd, arg) = input
            .split_once(' ')
            .map(|(c, a)| (c, a.trim()))
            .unwrap_or((input, ""));

        let Some(info) = self.registry.lookup(cmd) else {
            return match self.registry.suggest(cmd) {
                Some(suggestion) => Step::say(format!(
                    "Unknown command: {}. Did you mean {}?",
                    cmd, suggestion
                )),
                None => Step::say(format!(
                    "Unknown command: {}. Type /help for commands.",
                    cmd
                )),
            };
        };

        let name = info.name;
        match name {
            "/quit" => Step {
                output: "Goodbye!".into(),
                quit: true,
            },
            "/help" => Step::say(self.registry.help_text()),
            "/model" if arg.is_empty() => Step::say(match &self.model {
                Some(model) => format!("Model: {}", model),
                None => "No model selected. Use /model <model-id>.".into(),
            }),
            "/model" => match ModelId::parse(arg) {
                Ok(model) => {
                    let message = format!("Model set to {}", model);
                    self.model = Some(model);
                    Step::say(message)
                }
                Err(e) => Step::say(format!("Error: {}", e)),
            },
            "/prompts" => {
                let vendor = if arg.is_empty() {
                    None
                } else {
                    match Vendor::from_prefix(&arg.to_ascii_lowercase()) {
                        Vendor::Other => {
                            return Step::say(format!("No example prompts for vendor '{}'", arg));
                        }
                        v => Some(v),
                    }
                };
                Step::say(prompts::render(vendor))
            }
            "/history" => Step::say(self.render_history()),
            "/trace" => Step::say(match self.history.last_trace() {
                Some(envelope) => serde_json::to_string_pretty(envelope)
                    .unwrap_or_else(|e| format!("Error: {}", e)),
                None => "No trace yet.".into(),
            }),
            "/end" => {
                let closed = self.history.end();
                Step::say(
                    closed
                        .last()
                        .map(|farewell| farewell.answer.render())
                        .unwrap_or_default(),
                )
            }
            _ => Step::say(format!("Unhandled command: {}", name)),
        }
    }

    /// Send a prompt to the current model and record the turn.
    async fn submit(&mut self, prompt: &str) -> Step {
        if let Some(directive) = parse_model_directive(prompt) {
            match ModelId::parse(directive) {
                Ok(model) => self.model = Some(model),
                Err(e) => warn!(error = %e, "Ignoring model directive"),
            }
        }
        let Some(model) = self.model.clone() else {
            return Step::say("No model selected. Use /model <model-id> first.");
        };

        let mut event = ActionEvent::call_model(ACTION_GROUP, model.as_str(), prompt);
        event.session_id = Some(self.history.session_id().to_string());
        event.input_text = Some(prompt.to_string());

        match self.backend.send(&event).await {
            Ok(reply) => {
                let status = reply.status();
                let turn = self.history.record(prompt, reply);
                let rendered = turn.answer.render();
                if status == 200 {
                    Step::say(rendered)
                } else {
                    Step::say(format!("[{}] {}", status, rendered))
                }
            }
            Err(e) => Step::say(format!("Error: {}", e)),
        }
    }

    fn render_history(&self) -> String {
        if self.history.is_empty() {
            return "No conversation yet.".into();
        }
        let mut out = format!("Conversation ({} turns):\n", self.history.len());
        for turn in self.history.newest_first() {
            out.push_str(&format!(
                "\n[{}] Q: {}\n",
                turn.at.format("%H:%M:%S"),
                turn.question
            ));
            match &turn.answer {
                Answer::Text(text) => out.push_str(&format!("A: {}\n", text)),
                Answer::Table(_) => out.push_str(&format!("A:\n{}", turn.answer.render())),
            }
        }
        out
    }
}

/// Run the interactive loop on stdin/stdout.
pub async fn run_interactive(
    config: CallModelConfig,
    options: &RunOptions,
    model: Option<String>,
) -> anyhow::Result<()> {
    let model = model.map(|m| ModelId::parse(&m)).transpose()?;
    let backend = Backend::from_options(&config, options);

    println!("\x1b[1;32m  callmodel\x1b[0m v{}", env!("CARGO_PKG_VERSION"));
    println!(
        "  Model: {} | Backend: {}",
        model.as_ref().map(ModelId::as_str).unwrap_or("(none)"),
        backend.describe()
    );
    println!("  Type /help for commands, /quit to exit\n");

    let mut repl = Repl::new(backend, model);
    let stdin = io::stdin();
    loop {
        let label = repl.model().map(ModelId::name).unwrap_or("");
        print!("\x1b[1;34m{}> \x1b[0m", label);
        io::stdout().flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input).is_err() || input.is_empty() {
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        let step = repl.handle_line(input).await;
        if !step.output.is_empty() {
            println!("{}", step.output);
        }
        if step.quit {
            break;
        }
    }

    Ok(())
}

/// Send a single prompt and print the reply.
pub async fn run_single(
    config: CallModelConfig,
    options: &RunOptions,
    model: &str,
    prompt: &str,
    json: bool,
) -> anyhow::Result<()> {
    let model = ModelId::parse(model)?;
    let backend = Backend::from_options(&config, options);

    let event = ActionEvent::call_model(ACTION_GROUP, model.as_str(), prompt);
    let reply = backend.send(&event).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&reply)?);
    } else {
        println!("{}", Answer::from_body(reply.body()).render());
    }

    if reply.status() == 200 {
        Ok(())
    } else {
        anyhow::bail!("Action returned status {}", reply.status())
    }
}
