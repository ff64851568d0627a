//! REPL (Read-Eval-Print Loop) for interactive chat

use crate::output::console::ConsoleFormatter;
use crate::output::formatter::OutputFormatter;
use crate::progress::reporter::ProgressReporter;
use colored::Colorize;
use insights_application::{HandleTurnError, HandleTurnUseCase, NoProgress};
use insights_domain::OutputFormat;
use reedline::{DefaultPrompt, DefaultPromptSegment, FileBackedHistory, Reedline, Signal};
use std::sync::Arc;
use tracing::warn;

const HISTORY_CAPACITY: usize = 500;

/// Slash commands understood by the REPL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Help,
    Tools,
    Session,
    Close,
    Quit,
    Unknown(String),
}

impl ReplCommand {
    /// Parse a line starting with `/`.
    pub fn parse(line: &str) -> Self {
        let name = line.split_whitespace().next().unwrap_or_default();
        match name {
            "/help" | "/h" | "/?" => ReplCommand::Help,
            "/tools" => ReplCommand::Tools,
            "/session" => ReplCommand::Session,
            "/close" | "/reset" => ReplCommand::Close,
            "/quit" | "/exit" | "/q" => ReplCommand::Quit,
            other => ReplCommand::Unknown(other.to_string()),
        }
    }
}

/// Whether the loop keeps reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandResult {
    Continue,
    Exit,
}

/// Interactive chat REPL bound to one session
pub struct ChatRepl {
    use_case: Arc<HandleTurnUseCase>,
    session_id: String,
    format: OutputFormat,
    show_progress: bool,
}

impl ChatRepl {
    pub fn new(use_case: Arc<HandleTurnUseCase>, session_id: impl Into<String>) -> Self {
        Self {
            use_case,
            session_id: session_id.into(),
            format: OutputFormat::Narrative,
            show_progress: true,
        }
    }

    /// Set whether to show progress
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    fn line_editor() -> Reedline {
        let editor = Reedline::create();
        let Some(path) = dirs::data_dir().map(|p| p.join("exec-insights").join("history.txt"))
        else {
            return editor;
        };
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        match FileBackedHistory::with_file(HISTORY_CAPACITY, path) {
            Ok(history) => editor.with_history(Box::new(history)),
            Err(e) => {
                warn!("Chat history unavailable: {}", e);
                editor
            }
        }
    }

    /// Run the interactive REPL until `/quit` or end of input.
    pub async fn run(&self) -> std::io::Result<()> {
        let mut editor = Self::line_editor();
        let prompt = DefaultPrompt::new(
            DefaultPromptSegment::Basic("insights".to_string()),
            DefaultPromptSegment::Empty,
        );

        self.print_welcome();

        loop {
            match editor.read_line(&prompt)? {
                Signal::Success(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    if line.starts_with('/') {
                        let result = self.handle_command(ReplCommand::parse(line)).await;
                        if result == CommandResult::Exit {
                            break;
                        }
                        continue;
                    }
                    self.process_turn(line).await;
                }
                Signal::CtrlC => {
                    println!("^C");
                }
                // Ctrl-D
                _ => {
                    self.use_case.close_session(&self.session_id).await;
                    println!("Bye!");
                    break;
                }
            }
        }
        Ok(())
    }

    fn print_welcome(&self) {
        println!();
        println!("╭─────────────────────────────────────────────╮");
        println!("│        Executive Insights - Chat Mode       │");
        println!("╰─────────────────────────────────────────────╯");
        println!();
        println!("Session: {}", self.session_id);
        println!("Ask about security posture, security costs or security ROI.");
        println!();
        Self::print_help();
    }

    fn print_help() {
        println!("Commands:");
        println!("  /help, /h, /?     - Show this help");
        println!("  /tools            - List available tools");
        println!("  /session          - Show remembered parameters and history");
        println!("  /close            - Forget this session and start over");
        println!("  /quit, /exit, /q  - Exit chat");
        println!();
    }

    /// Handle a slash command.
    pub async fn handle_command(&self, command: ReplCommand) -> CommandResult {
        match command {
            ReplCommand::Quit => {
                self.use_case.close_session(&self.session_id).await;
                println!("Bye!");
                CommandResult::Exit
            }
            ReplCommand::Help => {
                println!();
                Self::print_help();
                CommandResult::Continue
            }
            ReplCommand::Tools => {
                println!();
                print!("{}", ConsoleFormatter::format_tools(self.use_case.dispatcher().registry()));
                CommandResult::Continue
            }
            ReplCommand::Session => {
                match self.use_case.sessions().snapshot(&self.session_id).await {
                    Some(context) => print!("{}", ConsoleFormatter::format_session(&context)),
                    None => println!("Session {} has no state yet", self.session_id),
                }
                CommandResult::Continue
            }
            ReplCommand::Close => {
                if self.use_case.close_session(&self.session_id).await {
                    println!("Session {} closed; the next question starts fresh", self.session_id);
                } else {
                    println!("Session {} has no state to close", self.session_id);
                }
                CommandResult::Continue
            }
            ReplCommand::Unknown(name) => {
                println!("Unknown command: {}", name);
                println!("Type /help for available commands");
                CommandResult::Continue
            }
        }
    }

    async fn process_turn(&self, text: &str) {
        println!();

        let result = if self.show_progress {
            let progress = ProgressReporter::new();
            self.use_case
                .handle_turn_with_progress(&self.session_id, text, &progress)
                .await
        } else {
            self.use_case
                .handle_turn_with_progress(&self.session_id, text, &NoProgress)
                .await
        };

        match result {
            Ok(answer) => println!("{}", ConsoleFormatter.render(&answer, self.format)),
            Err(HandleTurnError::Superseded(_)) => {
                println!("{}", "That question was replaced by a newer one.".dimmed());
            }
            Err(e) => eprintln!("{} {}", "Error:".red(), e),
        }
    }
}
