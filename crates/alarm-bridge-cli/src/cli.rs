use std::path::PathBuf;

use alarm_bridge_core::memory::PromptAnswer;
use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "alarm-bridge")]
#[command(about = "Drive the alarm bridge over newline-delimited JSON")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to the bridge config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Read commands from stdin and write replies and alarm events to stdout
    Serve {
        /// How the simulated authorization prompt is answered
        #[arg(long, value_enum, default_value_t = PromptAnswerArg::Authorize)]
        prompt_answer: PromptAnswerArg,
        /// Do not subscribe to alarm events
        #[arg(long)]
        no_events: bool,
    },
    /// Manage the bridge config file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the resolved config file path
    Path,
    /// Print the effective config, including environment overrides
    Show,
    /// Create or update the config file
    Init {
        /// Label used when a schedule command carries none
        #[arg(long, value_name = "TEXT")]
        default_label: Option<String>,
        /// Tint used when a schedule command carries none (e.g. #FF9500)
        #[arg(long, value_name = "HEX")]
        tint_color: Option<String>,
        /// Platform version reported by `getPlatformVersion`
        #[arg(long, value_name = "TEXT")]
        platform_version: Option<String>,
        /// Snapshots buffered per update stream
        #[arg(long, value_name = "N")]
        update_buffer: Option<usize>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum PromptAnswerArg {
    Authorize,
    Deny,
    Dismiss,
    Fail,
}

impl From<PromptAnswerArg> for PromptAnswer {
    fn from(value: PromptAnswerArg) -> Self {
        match value {
            PromptAnswerArg::Authorize => Self::Authorize,
            PromptAnswerArg::Deny => Self::Deny,
            PromptAnswerArg::Dismiss => Self::Dismiss,
            PromptAnswerArg::Fail => Self::Fail,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
    #[value(name = "powershell")]
    PowerShell,
}

impl From<CompletionShell> for Shell {
    fn from(value: CompletionShell) -> Self {
        match value {
            CompletionShell::Bash => Self::Bash,
            CompletionShell::Zsh => Self::Zsh,
            CompletionShell::Fish => Self::Fish,
            CompletionShell::PowerShell => Self::PowerShell,
        }
    }
}
