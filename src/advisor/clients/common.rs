use crate::advisor::client_wrapper::{Message, TokenUsage};
use openai_rust::chat;
use openai_rust2 as openai_rust;
use std::error::Error;
use std::sync::Mutex;

/// Convert crate messages into the `openai_rust2` wire representation.
pub fn to_chat_messages(messages: &[Message]) -> Vec<chat::Message> {
    let mut formatted = Vec::with_capacity(messages.len());
    for msg in messages {
        formatted.push(chat::Message {
            role: msg.role.as_str().to_owned(),
            content: msg.content.clone(),
        });
    }
    formatted
}

/// Send a chat request, record its usage, and return the assistant’s content.
pub async fn send_and_track(
    api: &openai_rust::Client,
    model: &str,
    formatted_msgs: Vec<chat::Message>,
    url_path: Option<String>,
    usage_slot: &Mutex<Option<TokenUsage>>,
) -> Result<String, Box<dyn Error + Send + Sync>> {
    let chat_arguments = chat::ChatArguments::new(model, formatted_msgs);

    let response = api.create_chat(chat_arguments, url_path).await;

    match response {
        Ok(response) => {
            let usage = TokenUsage {
                input_tokens: response.usage.prompt_tokens as usize,
                output_tokens: response.usage.completion_tokens as usize,
                total_tokens: response.usage.total_tokens as usize,
            };

            // Store it for get_last_usage()
            if let Ok(mut slot) = usage_slot.lock() {
                *slot = Some(usage);
            }

            match response.choices.first() {
                Some(choice) => Ok(choice.message.content.clone()),
                None => Err("model returned no choices".into()),
            }
        }
        Err(err) => {
            log::error!(
                "course_advisor::clients::common::send_and_track(...): chat API error: {}",
                err
            );
            Err(err.into())
        }
    }
}
