//! Slash command registry for the REPL.
//!
//! Holds metadata for every `/command`, for categorized help, alias
//! resolution, and typo suggestions.

/// Categories for grouping commands in `/help` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandCategory {
    Model,
    Session,
    System,
}

impl CommandCategory {
    pub fn label(&self) -> &'static str {
        match self {
            CommandCategory::Model => "Model",
            CommandCategory::Session => "Session",
            CommandCategory::System => "System",
        }
    }

    pub fn all() -> &'static [CommandCategory] {
        &[
            CommandCategory::Model,
            CommandCategory::Session,
            CommandCategory::System,
        ]
    }
}

/// Metadata describing a slash command.
#[derive(Debug, Clone)]
pub struct CommandInfo {
    /// Primary name including the slash, e.g. "/model".
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub description: &'static str,
    pub usage: &'static str,
    pub category: CommandCategory,
}

/// Registry holding all slash commands with their metadata.
pub struct CommandRegistry {
    commands: Vec<CommandInfo>,
}

impl CommandRegistry {
    /// Create a registry pre-populated with the REPL commands.
    pub fn with_defaults() -> Self {
        Self {
            commands: vec![
                command(
                    "/model",
                    &[],
                    "Show or set the model for following prompts",
                    "/model [model-id]",
                    CommandCategory::Model,
                ),
                command(
                    "/prompts",
                    &[],
                    "List example prompts, optionally for one vendor",
                    "/prompts [vendor]",
                    CommandCategory::Model,
                ),
                command(
                    "/history",
                    &[],
                    "Show conversation turns, most recent first",
                    "/history",
                    CommandCategory::Session,
                ),
                command(
                    "/trace",
                    &[],
                    "Print the last raw reply envelope",
                    "/trace",
                    CommandCategory::Session,
                ),
                command(
                    "/end",
                    &[],
                    "End the session and clear its history",
                    "/end",
                    CommandCategory::Session,
                ),
                command(
                    "/help",
                    &["/?"],
                    "Show this help",
                    "/help",
                    CommandCategory::System,
                ),
                command(
                    "/quit",
                    &["/exit", "/q"],
                    "Exit callmodel",
                    "/quit",
                    CommandCategory::System,
                ),
            ],
        }
    }

    /// Look up a command by name or alias.
    pub fn lookup(&self, input: &str) -> Option<&CommandInfo> {
        self.commands
            .iter()
            .find(|cmd| cmd.name == input || cmd.aliases.contains(&input))
    }

    /// Generate categorized help text.
    pub fn help_text(&self) -> String {
        let mut output = String::from("\nAvailable commands:\n");

        for category in CommandCategory::all() {
            output.push_str(&format!("\n  {}:\n", category.label()));
            for cmd in self.commands.iter().filter(|c| c.category == *category) {
                let aliases = if cmd.aliases.is_empty() {
                    String::new()
                } else {
                    format!(" ({})", cmd.aliases.join(", "))
                };
                output.push_str(&format!(
                    "    {:<24} {}{}\n",
                    cmd.usage, cmd.description, aliases
                ));
            }
        }

        output.push_str(
            "\nInput:\n  Type a prompt and press Enter. \"use model <id> ...\" also selects a model.\n",
        );
        output
    }

    /// Suggest the closest command for an unknown input using edit distance.
    pub fn suggest(&self, input: &str) -> Option<&str> {
        let mut best: Option<(&str, usize)> = None;

        for cmd in &self.commands {
            for name in std::iter::once(&cmd.name).chain(cmd.aliases.iter()) {
                let dist = edit_distance(input, name);
                if dist <= 2 && best.is_none_or(|(_, d)| dist < d) {
                    best = Some((*name, dist));
                }
            }
        }

        best.map(|(name, _)| name)
    }
}

fn command(
    name: &'static str,
    aliases: &'static [&'static str],
    description: &'static str,
    usage: &'static str,
    category: CommandCategory,
) -> CommandInfo {
    CommandInfo {
        name,
        aliases,
        description,
        usage,
        category,
    }
}

/// Simple Levenshtein edit distance for command suggestions.
fn edit_distance(a: &str, b: &str) -> usize {
    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();
    let b_len = b_bytes.len();

    let mut prev = (0..=b_len).collect::<Vec<_>>();
    let mut curr = vec![0; b_len + 1];

    for i in 1..=a_bytes.len() {
        curr[0] = i;
        for j in 1..=b_len {
            let cost = usize::from(a_bytes[i - 1] != b_bytes[j - 1]);
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_len]
}
