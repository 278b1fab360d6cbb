//! Console loop for chatting with the advising agent.
//!
//! Input and output are generic so the loop can be driven from a script or a test; the
//! binary passes async stdin, stdout and a Ctrl-C future as the shutdown signal.

use crate::advisor::agent::Agent;
use std::future::Future;
use std::io::{self, Write};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Separator printed after every answer.
pub const SEPARATOR: &str = "--------------------------------------------------";

const EXIT_WORDS: [&str; 3] = ["quit", "exit", "q"];

/// Whether `input` ends the session. Comparison ignores case and surrounding whitespace.
pub fn is_exit_command(input: &str) -> bool {
    let input = input.trim();
    EXIT_WORDS.iter().any(|w| w.eq_ignore_ascii_case(input))
}

pub fn print_banner<W: Write>(output: &mut W) -> io::Result<()> {
    writeln!(output, "Course Recommendation Agent")?;
    writeln!(output, "==================================================")?;
    writeln!(
        output,
        "Ask about student records, course offerings, prerequisites, or recommendations."
    )?;
    writeln!(output, "Type 'quit', 'exit', or 'q' to end the session.")?;
    writeln!(output)
}

/// Run the read-ask-print loop until an exit word, end of input, or `shutdown` completes.
///
/// `shutdown` is watched both at the prompt and while the agent is answering; when it fires
/// the session ends with `Goodbye!`. Agent errors are printed and the loop continues; only
/// I/O errors end it early.
pub async fn run_interactive<R, W, S>(
    agent: &mut Agent,
    input: R,
    output: &mut W,
    shutdown: S,
) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut lines = input.lines();
    print_banner(output)?;

    loop {
        write!(output, "You: ")?;
        output.flush()?;

        let line = tokio::select! {
            biased;

            _ = &mut shutdown => {
                writeln!(output, "\nGoodbye!")?;
                break;
            }

            line = lines.next_line() => line?,
        };
        let line = match line {
            Some(line) => line,
            None => {
                writeln!(output, "\nGoodbye!")?;
                break;
            }
        };

        let question = line.trim();
        if is_exit_command(question) {
            writeln!(output, "Goodbye!")?;
            break;
        }
        if question.is_empty() {
            continue;
        }

        let outcome = tokio::select! {
            biased;

            _ = &mut shutdown => {
                log::info!("interrupted while the agent was answering");
                writeln!(output, "\nGoodbye!")?;
                break;
            }

            outcome = agent.send(question) => outcome,
        };

        match outcome {
            Ok(response) => {
                writeln!(output, "Agent: {}", response.content)?;
                writeln!(output, "{}", SEPARATOR)?;
            }
            Err(err) => {
                log::error!("agent call failed: {}", err);
                writeln!(output, "Error: {}", err)?;
                writeln!(output, "Please try again.")?;
            }
        }
    }

    output.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_words() {
        assert!(is_exit_command("quit"));
        assert!(is_exit_command("  EXIT "));
        assert!(is_exit_command("Q"));
        assert!(!is_exit_command("quite"));
        assert!(!is_exit_command(""));
    }

    #[test]
    fn test_separator_width() {
        assert_eq!(SEPARATOR.len(), 50);
        assert!(SEPARATOR.chars().all(|c| c == '-'));
    }
}
