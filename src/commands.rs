use clap::{CommandFactory, Parser, Subcommand};

use crate::api::quiz::{OptionId, QuestionId};

/// One line typed by the user, without its leading `/`.
#[derive(Debug, Parser)]
#[command(
    no_binary_name = true,
    disable_help_flag = true,
    disable_help_subcommand = true,
    disable_version_flag = true
)]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// display help.
    Help,
    /// select (or toggle) an answer option
    Select { question: QuestionId, option: OptionId },
    /// answer a text question
    Text {
        question: QuestionId,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        words: Vec<String>,
    },
    /// clear an answer
    Clear { question: QuestionId },
    /// show answers and outstanding issues
    Status,
    /// complete the survey
    Submit,
    /// abandon the attempt
    Cancel,
}

#[derive(Debug, thiserror::Error)]
pub enum ParseCommandError {
    #[error("Commands start with '/'. Enter /help to see usages.")]
    NotACommand,
    #[error("{0}")]
    Invalid(#[from] clap::Error),
}

impl Command {
    /// Parses a `/command arg ...` line.
    pub fn parse_line(line: &str) -> Result<Self, ParseCommandError> {
        let rest = line
            .trim()
            .strip_prefix('/')
            .ok_or(ParseCommandError::NotACommand)?;
        Ok(CommandLine::try_parse_from(rest.split_whitespace())?.command)
    }

    pub fn descriptions() -> String {
        CommandLine::command()
            .get_subcommands()
            .map(|sub| {
                let mut usage = format!("/{}", sub.get_name());
                for arg in sub.get_positionals() {
                    usage.push_str(&format!(" <{}>", arg.get_id()));
                }
                let about = sub.get_about().map(|a| a.to_string()).unwrap_or_default();
                format!("{usage:28} - {about}")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_is_well_formed() {
        CommandLine::command().debug_assert();
    }

    #[test]
    fn parses_simple_commands() {
        assert_eq!(Command::parse_line("/help").unwrap(), Command::Help);
        assert_eq!(Command::parse_line(" /submit ").unwrap(), Command::Submit);
        assert_eq!(Command::parse_line("/status").unwrap(), Command::Status);
        assert_eq!(Command::parse_line("/cancel").unwrap(), Command::Cancel);
    }

    #[test]
    fn parses_answers() {
        assert_eq!(
            Command::parse_line("/select 2 1").unwrap(),
            Command::Select { question: 2, option: 1 }
        );
        assert_eq!(
            Command::parse_line("/text 1 some -spaced text").unwrap(),
            Command::Text {
                question: 1,
                words: vec!["some".into(), "-spaced".into(), "text".into()]
            }
        );
        assert_eq!(
            Command::parse_line("/text 1").unwrap(),
            Command::Text {
                question: 1,
                words: vec![]
            }
        );
        assert_eq!(
            Command::parse_line("/clear 3").unwrap(),
            Command::Clear { question: 3 }
        );
    }

    #[test]
    fn reports_bad_input() {
        assert!(matches!(
            Command::parse_line("hello"),
            Err(ParseCommandError::NotACommand)
        ));
        for line in ["/start", "/select two 1", "/select 2 1 3", "/clear"] {
            assert!(
                matches!(Command::parse_line(line), Err(ParseCommandError::Invalid(_))),
                "{line} should not parse"
            );
        }
    }

    #[test]
    fn help_lists_every_command() {
        let help = Command::descriptions();
        for usage in [
            "/help",
            "/select <question> <option>",
            "/text <question> <words>",
            "/clear <question>",
            "/status",
            "/submit",
            "/cancel",
        ] {
            assert!(help.contains(usage), "{usage} missing from help");
        }
    }
}
