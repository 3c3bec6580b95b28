use ai::AgentEvent;
use chat::{Message, Renderer, Role};
use colored::Colorize;

/// Prints the transcript to stdout as it grows.
#[derive(Debug)]
pub struct TerminalRenderer {
    /// Print the agent's tool calls and results while it works.
    pub show_steps: bool,
}

impl Renderer for TerminalRenderer {
    fn render_message(&mut self, message: &Message) {
        let label = match message.role() {
            Role::User => "[You]".green().bold(),
            Role::Assistant => "[Assistant]".blue().bold(),
        };
        println!("\n{label} {}", message.content());
    }

    fn render_event(&mut self, event: &AgentEvent) {
        if !self.show_steps {
            return;
        }

        match event {
            AgentEvent::Thought(text) => println!("  {}", text.italic().dimmed()),
            AgentEvent::ToolCall(call) => {
                println!("  {} {}({})", "→".dimmed(), call.name.cyan(), call.arguments.dimmed());
            }
            AgentEvent::ToolResult {
                rows: Some(rows), ..
            } if !rows.is_empty() => println!("{}", rows.to_table()),
            AgentEvent::ToolResult { output, .. } => {
                let preview: String = output.chars().take(300).collect();
                println!("  {}", preview.dimmed());
            }
        }
    }

    fn clear(&mut self) {
        println!("\n{}", "── chat history cleared ──".dimmed());
    }
}
