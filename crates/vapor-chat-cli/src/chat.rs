//! Interactive chat loop for the CLI
//!
//! Drives a [`Session`] from stdin: each non-empty line becomes a chat
//! message, and connection events are dispatched to the event sink as they
//! arrive. When the connection drops the user chooses whether to retry,
//! pick a new username, or quit.

use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use vapor_chat_core::{ChatConfig, Dispatch, EventSink, Session};

type Input = Lines<BufReader<Stdin>>;

/// What to do after the connection is lost
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AfterDisconnect {
    Retry,
    Rename,
    Quit,
}

fn parse_choice(answer: &str) -> Option<AfterDisconnect> {
    match answer.trim().to_ascii_lowercase().as_str() {
        "" | "r" | "retry" => Some(AfterDisconnect::Retry),
        "n" | "name" | "rename" => Some(AfterDisconnect::Rename),
        "k" | "kill" | "q" | "quit" => Some(AfterDisconnect::Quit),
        _ => None,
    }
}

fn parse_username(line: &str) -> Option<String> {
    let name = line.trim();
    (!name.is_empty()).then(|| name.to_string())
}

/// Run the chat until stdin closes or the user quits
pub async fn run_chat<E: EventSink + 'static>(
    config: ChatConfig,
    username: Option<String>,
    event_sink: E,
    json_output: bool,
) -> Result<(), String> {
    let sink = Arc::new(event_sink);
    let mut session = Session::new(config, &sink);
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    let username = match username.as_deref().and_then(parse_username) {
        Some(name) => name,
        None => prompt_username(&mut input).await?,
    };
    session.set_username(username);
    session
        .start()
        .map_err(|e| format!("Failed to start session: {e}"))?;

    loop {
        tokio::select! {
            line = input.next_line() => match line {
                Ok(Some(line)) => {
                    let text = line.trim();
                    if text.is_empty() {
                        continue;
                    }
                    match session.send_message(text) {
                        Ok(message) if json_output => {
                            let message_json = serde_json::to_string(&message)
                                .map_err(|e| format!("Failed to encode message: {e}"))?;
                            println!(r#"{{"event":"sent","payload":{message_json}}}"#);
                        }
                        Ok(_) => {}
                        Err(e) => tracing::warn!("Message not sent: {}", e),
                    }
                }
                Ok(None) => {
                    tracing::info!("stdin closed");
                    session.close();
                    return Ok(());
                }
                Err(e) => {
                    session.close();
                    return Err(format!("Error reading stdin: {e}"));
                }
            },

            dispatch = session.dispatch_next(), if session.is_active() => {
                if let Dispatch::Disconnected(_) = dispatch {
                    match prompt_after_disconnect(&mut input).await? {
                        AfterDisconnect::Retry => {}
                        AfterDisconnect::Rename => {
                            let name = prompt_username(&mut input).await?;
                            session.set_username(name);
                        }
                        AfterDisconnect::Quit => return Ok(()),
                    }
                    session
                        .start()
                        .map_err(|e| format!("Failed to restart session: {e}"))?;
                }
            }
        }
    }
}

async fn prompt_username(input: &mut Input) -> Result<String, String> {
    loop {
        eprintln!("Enter a username:");
        match input.next_line().await {
            Ok(Some(line)) => {
                if let Some(name) = parse_username(&line) {
                    return Ok(name);
                }
            }
            Ok(None) => return Err("stdin closed before a username was entered".to_string()),
            Err(e) => return Err(format!("Error reading stdin: {e}")),
        }
    }
}

async fn prompt_after_disconnect(input: &mut Input) -> Result<AfterDisconnect, String> {
    loop {
        eprintln!("Connection lost. [r]etry, [n]ew username, or [k]ill?");
        match input.next_line().await {
            Ok(Some(line)) => {
                if let Some(choice) = parse_choice(&line) {
                    return Ok(choice);
                }
            }
            Ok(None) => return Ok(AfterDisconnect::Quit),
            Err(e) => return Err(format!("Error reading stdin: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_choice() {
        assert_eq!(parse_choice(""), Some(AfterDisconnect::Retry));
        assert_eq!(parse_choice(" R \n"), Some(AfterDisconnect::Retry));
        assert_eq!(parse_choice("rename"), Some(AfterDisconnect::Rename));
        assert_eq!(parse_choice("kill"), Some(AfterDisconnect::Quit));
        assert_eq!(parse_choice("q"), Some(AfterDisconnect::Quit));
        assert_eq!(parse_choice("maybe"), None);
    }

    #[test]
    fn test_parse_username() {
        assert_eq!(parse_username("  alice \n"), Some("alice".to_string()));
        assert_eq!(parse_username("null"), Some("null".to_string()));
        assert_eq!(parse_username("   "), None);
    }
}
