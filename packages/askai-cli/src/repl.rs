//! Interactive chat loop.
//!
//! Input keeps being read while a reply is pending; the send itself runs on
//! a spawned task that applies its outcome back into the shared session.
//! Pending sends are awaited before the loop returns.

use anyhow::Result;
use askai_core::{
    ChatClient, ChatSession, FileDescriptor, Message, Outcome, Sender, Transcript,
    WELCOME_SUGGESTIONS,
};
use chrono::Local;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;

/// One parsed line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    Empty,
    Text(String),
    New,
    Attach(String),
    Detach(String),
    Files,
    History,
    Suggest(Option<usize>),
    Send,
    Help,
    Quit,
    Unknown(String),
}

fn parse_line(line: &str) -> Input {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Input::Empty;
    }
    if !trimmed.starts_with('/') {
        return Input::Text(line.to_string());
    }

    let (command, arg) = match trimmed.split_once(char::is_whitespace) {
        Some((command, arg)) => (command, arg.trim()),
        None => (trimmed, ""),
    };

    match command {
        "/new" => Input::New,
        "/attach" if !arg.is_empty() => Input::Attach(arg.to_string()),
        "/detach" if !arg.is_empty() => Input::Detach(arg.to_string()),
        "/files" => Input::Files,
        "/history" => Input::History,
        "/suggest" if arg.is_empty() => Input::Suggest(None),
        "/suggest" => match arg.parse::<usize>() {
            Ok(n) if n > 0 => Input::Suggest(Some(n - 1)),
            _ => Input::Unknown(trimmed.to_string()),
        },
        "/send" => Input::Send,
        "/help" => Input::Help,
        "/quit" | "/exit" => Input::Quit,
        _ => Input::Unknown(trimmed.to_string()),
    }
}

type SharedSession = Arc<Mutex<ChatSession>>;

fn lock(session: &SharedSession) -> MutexGuard<'_, ChatSession> {
    session.lock().unwrap_or_else(|e| e.into_inner())
}

/// Run the interactive session on stdin until EOF or `/quit`.
pub async fn run(client: ChatClient, user_id: String) -> Result<()> {
    let input = BufReader::new(tokio::io::stdin());
    drive(client, user_id, input).await?;
    Ok(())
}

/// Process `input` line by line, then wait for every reply still in
/// flight. Returns the final transcript.
async fn drive<R>(client: ChatClient, user_id: String, input: R) -> Result<Transcript>
where
    R: AsyncBufRead + Unpin,
{
    let session: SharedSession = Arc::new(Mutex::new(ChatSession::new(user_id)));
    let client = Arc::new(client);
    let mut in_flight = JoinSet::new();

    print_welcome();

    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        // Reap finished sends
        while in_flight.try_join_next().is_some() {}

        match parse_line(&line) {
            Input::Empty | Input::Send => {
                if lock(&session).is_sendable() {
                    send(&session, &client, &mut in_flight);
                }
            }
            Input::Text(text) => {
                lock(&session).set_draft(text);
                send(&session, &client, &mut in_flight);
            }
            Input::New => {
                lock(&session).start_new_session();
                print_welcome();
            }
            Input::Attach(path) => match FileDescriptor::from_path(&path) {
                Ok(file) => {
                    let info = lock(&session).attach(file);
                    println!("Attached {} ({} bytes) [{}]", info.name, info.size, info.id);
                }
                Err(e) => println!("Cannot attach {}: {}", path, e),
            },
            Input::Detach(id) => {
                if lock(&session).detach(&id) {
                    println!("Removed {}", id);
                }
            }
            Input::Files => {
                let session = lock(&session);
                if session.attachments().is_empty() {
                    println!("No attachments");
                }
                for attachment in session.attachments().iter() {
                    println!("  {} ({} bytes) [{}]", attachment.name, attachment.size, attachment.id);
                }
            }
            Input::History => {
                let transcript = lock(&session).transcript();
                for message in &transcript {
                    print_message(message);
                }
            }
            Input::Suggest(None) => {
                for (i, prompt) in WELCOME_SUGGESTIONS.iter().enumerate() {
                    println!("  {}. {}", i + 1, prompt);
                }
            }
            Input::Suggest(Some(index)) => {
                let mut session = lock(&session);
                if session.apply_suggestion(index) {
                    println!("> {} (press Enter or /send to send)", session.draft());
                } else {
                    println!("No suggestion {}", index + 1);
                }
            }
            Input::Help => print_help(),
            Input::Quit => break,
            Input::Unknown(command) => println!("Unknown command: {} (try /help)", command),
        }
    }

    if !in_flight.is_empty() {
        tracing::debug!("Input closed, waiting for {} pending reply", in_flight.len());
    }
    while let Some(result) = in_flight.join_next().await {
        if let Err(e) = result {
            tracing::warn!("Send task failed: {}", e);
        }
    }

    let transcript = lock(&session).transcript();
    Ok(transcript)
}

/// Commit the draft and deliver it in the background.
fn send(session: &SharedSession, client: &Arc<ChatClient>, in_flight: &mut JoinSet<()>) {
    let pending = match lock(session).begin_submit() {
        Ok(pending) => pending,
        Err(e) => {
            println!("{}", e);
            return;
        }
    };
    println!("AI is typing...");

    let session = Arc::clone(session);
    let client = Arc::clone(client);
    in_flight.spawn(async move {
        let outcome = client.chat(pending.request()).await;

        let mut session = lock(&session);
        match session.apply_outcome(pending, outcome) {
            Outcome::Replied | Outcome::Failed => {
                if let Some(message) = session.transcript().iter().last() {
                    print_message(message);
                }
            }
            Outcome::Discarded => {}
        }
    });
}

fn format_message(message: &Message) -> String {
    let time = message.timestamp.with_timezone(&Local).format("%H:%M:%S");
    format!("[{}] {}: {}", time, message.sender.label(), message.content)
}

fn print_message(message: &Message) {
    println!("{}", format_message(message));
    if message.sender == Sender::User {
        for attachment in &message.attachments {
            println!("      + {} ({} bytes)", attachment.name, attachment.size);
        }
    }
}

fn print_welcome() {
    println!("Welcome to AI Chat");
    println!("How can I help you today? (/suggest for ideas, /help for commands)");
}

fn print_help() {
    println!("/new             start a new chat");
    println!("/attach <path>   attach a file to the next message");
    println!("/detach <id>     remove an attachment");
    println!("/files           list pending attachments");
    println!("/history         show the transcript");
    println!("/suggest [n]     list suggestions, or put suggestion n in the draft");
    println!("/send            send the current draft (same as an empty line)");
    println!("/quit            exit");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn test_parse_plain_text_keeps_line() {
        assert_eq!(parse_line("  hello there "), Input::Text("  hello there ".to_string()));
        assert_eq!(parse_line("   "), Input::Empty);
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_line("/new"), Input::New);
        assert_eq!(parse_line("/attach ./notes.txt"), Input::Attach("./notes.txt".to_string()));
        assert_eq!(parse_line("/detach abc"), Input::Detach("abc".to_string()));
        assert_eq!(parse_line("/files"), Input::Files);
        assert_eq!(parse_line("/history"), Input::History);
        assert_eq!(parse_line("/quit"), Input::Quit);
        assert_eq!(parse_line("/exit"), Input::Quit);
    }

    #[test]
    fn test_parse_suggest() {
        assert_eq!(parse_line("/suggest"), Input::Suggest(None));
        assert_eq!(parse_line("/suggest 1"), Input::Suggest(Some(0)));
        assert!(matches!(parse_line("/suggest 0"), Input::Unknown(_)));
        assert!(matches!(parse_line("/suggest x"), Input::Unknown(_)));
    }

    #[test]
    fn test_parse_missing_argument() {
        assert!(matches!(parse_line("/attach"), Input::Unknown(_)));
        assert!(matches!(parse_line("/bogus"), Input::Unknown(_)));
    }

    #[test]
    fn test_parse_send() {
        assert_eq!(parse_line("/send"), Input::Send);
        assert_eq!(parse_line(""), Input::Empty);
    }

    #[test]
    fn test_format_message_uses_local_time() {
        let message = Message::assistant("Hi there");
        let expected = message.timestamp.with_timezone(&Local).format("%H:%M:%S").to_string();

        let line = format_message(&message);
        assert_eq!(line, format!("[{}] {}: Hi there", expected, Sender::Assistant.label()));
    }

    /// Answer each of `count` connections with `body` after `delay`.
    async fn serve_replies(count: usize, body: &'static str, delay: Duration) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            for _ in 0..count {
                let (mut stream, _) = listener.accept().await.unwrap();
                read_request(&mut stream).await;
                tokio::time::sleep(delay).await;

                let response = format!(
                    "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                stream.write_all(response.as_bytes()).await.unwrap();
                stream.shutdown().await.ok();
            }
        });

        format!("http://{}", addr)
    }

    async fn read_request(stream: &mut tokio::net::TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf);
            if let Some(split) = text.find("\r\n\r\n") {
                let length = text[..split]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= split + 4 + length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn test_client(base: &str) -> ChatClient {
        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        ChatClient::with_client(&format!("{}/chat", base), "/health", client).unwrap()
    }

    #[tokio::test]
    async fn test_reply_in_flight_at_eof_is_kept() {
        let base = serve_replies(1, r#"{"response":"Hi there"}"#, Duration::from_millis(200)).await;

        let transcript = drive(test_client(&base), "tester".to_string(), &b"hello\n"[..])
            .await
            .unwrap();

        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.get(0).unwrap().content, "hello");
        let reply = transcript.get(1).unwrap();
        assert_eq!(reply.sender, Sender::Assistant);
        assert_eq!(reply.content, "Hi there");
    }

    #[tokio::test]
    async fn test_reply_in_flight_at_quit_is_kept() {
        let base = serve_replies(1, r#"{"response":"Bye"}"#, Duration::from_millis(200)).await;

        let input = &b"hello\n/quit\nnever read\n"[..];
        let transcript = drive(test_client(&base), "tester".to_string(), input).await.unwrap();

        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.get(1).unwrap().content, "Bye");
    }

    #[tokio::test]
    async fn test_suggestion_fills_draft_until_sent() {
        let base = serve_replies(1, r#"{"response":"Qubits"}"#, Duration::ZERO).await;

        // Picking a suggestion alone sends nothing
        let transcript = drive(test_client(&base), "tester".to_string(), &b"/suggest 1\n"[..])
            .await
            .unwrap();
        assert!(transcript.is_empty());

        let input = &b"/suggest 1\n/send\n"[..];
        let transcript = drive(test_client(&base), "tester".to_string(), input).await.unwrap();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.get(0).unwrap().content, WELCOME_SUGGESTIONS[0]);
        assert_eq!(transcript.get(1).unwrap().content, "Qubits");
    }

    #[tokio::test]
    async fn test_empty_line_sends_pending_draft_only() {
        let base = serve_replies(1, r#"{"response":"Sure"}"#, Duration::ZERO).await;

        // The leading empty line has no draft and must not send
        let input = &b"\n/suggest 2\n\n"[..];
        let transcript = drive(test_client(&base), "tester".to_string(), input).await.unwrap();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.get(0).unwrap().content, WELCOME_SUGGESTIONS[1]);
        assert_eq!(transcript.get(1).unwrap().content, "Sure");
    }
}
