//! Console loop tests driven from in-memory input.

use async_trait::async_trait;
use course_advisor::client_wrapper::{ClientWrapper, Message, Role};
use course_advisor::interactive::{run_interactive, SEPARATOR};
use course_advisor::Agent;
use std::error::Error;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Answers `echo: <question>`, fails when the question contains "fail", and never answers
/// when it contains "stall".
struct EchoClient {
    calls: AtomicUsize,
}

#[async_trait]
impl ClientWrapper for EchoClient {
    async fn send_message(
        &self,
        messages: &[Message],
    ) -> Result<Message, Box<dyn Error + Send + Sync>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let question = messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        if question.contains("stall") {
            std::future::pending::<()>().await;
        }
        if question.contains("fail") {
            return Err("throttled by model provider".into());
        }
        Ok(Message::new(Role::Assistant, format!("echo: {}", question)))
    }

    fn model_name(&self) -> &str {
        "echo"
    }
}

async fn run(input: &str) -> (String, usize) {
    let client = Arc::new(EchoClient {
        calls: AtomicUsize::new(0),
    });
    let mut agent = Agent::new("advisor", "Advisor", client.clone());
    let mut output = Vec::new();
    run_interactive(
        &mut agent,
        Cursor::new(input.to_string()),
        &mut output,
        std::future::pending::<()>(),
    )
    .await
    .unwrap();
    (
        String::from_utf8(output).unwrap(),
        client.calls.load(Ordering::SeqCst),
    )
}

#[tokio::test]
async fn test_question_then_quit() {
    let (out, calls) = run("How many credits has student 1 earned?\nquit\nnever asked\n").await;

    assert_eq!(calls, 1);
    assert!(out.contains("Type 'quit', 'exit', or 'q' to end the session."));
    assert!(out.contains("Agent: echo: How many credits has student 1 earned?\n"));
    assert!(out.contains(&format!("{}\n", SEPARATOR)));
    assert!(out.trim_end().ends_with("Goodbye!"));
    assert!(!out.contains("never asked"));
}

#[tokio::test]
async fn test_exit_words_are_case_insensitive() {
    for word in ["EXIT", "Q", "  Quit  "] {
        let (out, calls) = run(&format!("{}\nhello\n", word)).await;
        assert_eq!(calls, 0, "{} should end the session", word);
        assert!(out.contains("Goodbye!"));
    }
}

#[tokio::test]
async fn test_blank_lines_are_skipped() {
    let (out, calls) = run("\n   \n\nq\n").await;
    assert_eq!(calls, 0);
    assert_eq!(out.matches("You: ").count(), 4);
}

#[tokio::test]
async fn test_end_of_input_says_goodbye() {
    let (out, calls) = run("What are the prerequisites for BIOL P110?").await;
    assert_eq!(calls, 1);
    assert!(out.contains("Agent: echo: What are the prerequisites for BIOL P110?"));
    assert!(out.trim_end().ends_with("Goodbye!"));
}

#[tokio::test]
async fn test_agent_error_keeps_loop_running() {
    let (out, calls) = run("please fail\nsecond question\nexit\n").await;

    assert_eq!(calls, 2);
    assert!(out.contains("Error: throttled by model provider\nPlease try again.\n"));
    assert!(out.contains("Agent: echo: second question"));
}

#[tokio::test]
async fn test_interrupt_at_prompt_says_goodbye() {
    let client = Arc::new(EchoClient {
        calls: AtomicUsize::new(0),
    });
    let mut agent = Agent::new("advisor", "Advisor", client.clone());
    let mut output = Vec::new();

    run_interactive(
        &mut agent,
        Cursor::new("never read\n".to_string()),
        &mut output,
        std::future::ready(()),
    )
    .await
    .unwrap();

    let out = String::from_utf8(output).unwrap();
    assert!(out.ends_with("You: \nGoodbye!\n"), "{}", out);
    assert_eq!(client.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_interrupt_while_agent_answers() {
    let client = Arc::new(EchoClient {
        calls: AtomicUsize::new(0),
    });
    let mut agent = Agent::new("advisor", "Advisor", client.clone());
    let mut output = Vec::new();

    run_interactive(
        &mut agent,
        Cursor::new("please stall\nsecond question\n".to_string()),
        &mut output,
        tokio::time::sleep(std::time::Duration::from_millis(50)),
    )
    .await
    .unwrap();

    let out = String::from_utf8(output).unwrap();
    assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    assert!(!out.contains("Agent:"));
    assert!(out.trim_end().ends_with("Goodbye!"));
}
