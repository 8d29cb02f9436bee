//! Chat session frame handler.

use super::room::{Membership, Room};
use crate::error::HandlerError;
use crate::runtime::{FrameHandler, Outbox, Reply};
use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, trace};

/// Greeting sent as soon as a connection is accepted.
pub const PROMPT: &[u8] = b"Welcome to the chat room! What shall I call you?\n";

/// Longest accepted username, in bytes.
pub const MAX_USERNAME_LEN: usize = 16;

enum State {
    /// Prompt sent, first line will be the username.
    AwaitingName,
    /// In the room; leaving happens when the membership drops.
    Joined(Membership),
}

/// Per-connection chat state machine.
pub struct ChatSession {
    room: Arc<Room>,
    outbox: Outbox,
    state: State,
}

impl ChatSession {
    /// Start a session and queue the username prompt.
    pub fn new(room: Arc<Room>, outbox: Outbox) -> Self {
        if outbox.send(Bytes::from_static(PROMPT)).is_err() {
            debug!("Connection closed before the prompt was sent");
        }
        Self {
            room,
            outbox,
            state: State::AwaitingName,
        }
    }

    fn join(&mut self, frame: &[u8]) -> Reply {
        if !is_valid_username(frame) {
            debug!(
                username = %String::from_utf8_lossy(frame),
                "Rejected invalid username"
            );
            return Reply::Close;
        }

        // Validated as ASCII alphanumerics above
        let name = String::from_utf8_lossy(frame).into_owned();

        match self.room.join(name, self.outbox.clone()) {
            Ok(membership) => {
                self.state = State::Joined(membership);
                Reply::Silent
            }
            Err(e) => {
                debug!(error = %e, "Rejected username");
                Reply::Close
            }
        }
    }
}

impl FrameHandler for ChatSession {
    fn handle(&mut self, frame: Bytes) -> Result<Reply, HandlerError> {
        match &self.state {
            State::AwaitingName => Ok(self.join(&frame)),
            State::Joined(membership) => {
                trace!(user = membership.name(), len = frame.len(), "Relaying message");
                membership.say(&frame);
                Ok(Reply::Silent)
            }
        }
    }
}

/// Usernames are 1 to 16 ASCII letters or digits.
pub fn is_valid_username(name: &[u8]) -> bool {
    !name.is_empty()
        && name.len() <= MAX_USERNAME_LEN
        && name.iter().all(u8::is_ascii_alphanumeric)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{run_framed, Framing};
    use tokio::io::{duplex, AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::sync::mpsc;

    #[test]
    fn test_username_validation() {
        assert!(!is_valid_username(b""));
        assert!(!is_valid_username(b"abcdefghijklmnopq"));
        assert!(is_valid_username(b"abcdefghijklmnop"));
        assert!(is_valid_username(b"abc123"));
        assert!(is_valid_username(b"X"));
        assert!(!is_valid_username(b"abc!"));
        assert!(!is_valid_username(b"two words"));
        assert!(!is_valid_username("caf\u{e9}".as_bytes()));
    }

    #[test]
    fn test_session_prompts_then_joins() {
        let room = Room::new();
        let (outbox, mut queue) = mpsc::unbounded_channel();
        let mut session = ChatSession::new(Arc::clone(&room), outbox);

        assert_eq!(queue.try_recv().unwrap(), PROMPT);

        let reply = session.handle(Bytes::from_static(b"alice")).unwrap();
        assert_eq!(reply, Reply::Silent);
        assert_eq!(room.members(), vec!["alice"]);
        assert_eq!(queue.try_recv().unwrap(), "* the room contains: \n");

        drop(session);
        assert!(room.members().is_empty());
    }

    #[test]
    fn test_session_on_closed_connection() {
        let room = Room::new();
        let (bob_out, mut bob_queue) = mpsc::unbounded_channel();
        let _bob = room.join("bob".to_string(), bob_out).unwrap();
        bob_queue.try_recv().unwrap();

        let (outbox, queue) = mpsc::unbounded_channel();
        drop(queue);
        let mut session = ChatSession::new(Arc::clone(&room), outbox);

        let reply = session.handle(Bytes::from_static(b"alice")).unwrap();
        assert_eq!(reply, Reply::Silent);
        assert_eq!(bob_queue.try_recv().unwrap(), "* alice has entered the room\n");

        drop(session);
        assert_eq!(bob_queue.try_recv().unwrap(), "* alice has left the room\n");
        assert_eq!(room.members(), vec!["bob"]);
    }

    #[test]
    fn test_session_rejects_bad_name() {
        let room = Room::new();
        let (outbox, _queue) = mpsc::unbounded_channel();
        let mut session = ChatSession::new(Arc::clone(&room), outbox);

        let reply = session.handle(Bytes::from_static(b"bad name!")).unwrap();
        assert_eq!(reply, Reply::Close);
        assert!(room.members().is_empty());
    }

    #[test]
    fn test_session_rejects_taken_name() {
        let room = Room::new();
        let (first_out, _first_queue) = mpsc::unbounded_channel();
        let (second_out, _second_queue) = mpsc::unbounded_channel();
        let mut first = ChatSession::new(Arc::clone(&room), first_out);
        let mut second = ChatSession::new(Arc::clone(&room), second_out);

        assert_eq!(first.handle(Bytes::from_static(b"alice")).unwrap(), Reply::Silent);
        assert_eq!(second.handle(Bytes::from_static(b"alice")).unwrap(), Reply::Close);
        assert_eq!(room.members(), vec!["alice"]);
    }

    #[tokio::test]
    async fn test_chat_over_worker() {
        let room = Room::new();

        let (alice_client, alice_server) = duplex(1024);
        let (bob_client, bob_server) = duplex(1024);

        let alice_room = Arc::clone(&room);
        let alice_worker = tokio::spawn(run_framed(alice_server, Framing::Line, move |outbox| {
            ChatSession::new(alice_room, outbox)
        }));
        let bob_room = Arc::clone(&room);
        let bob_worker = tokio::spawn(run_framed(bob_server, Framing::Line, move |outbox| {
            ChatSession::new(bob_room, outbox)
        }));

        let (alice_read, mut alice_write) = tokio::io::split(alice_client);
        let (bob_read, mut bob_write) = tokio::io::split(bob_client);
        let mut alice_lines = BufReader::new(alice_read).lines();
        let mut bob_lines = BufReader::new(bob_read).lines();

        let prompt = "Welcome to the chat room! What shall I call you?";
        assert_eq!(alice_lines.next_line().await.unwrap().unwrap(), prompt);
        alice_write.write_all(b"alice\n").await.unwrap();
        assert_eq!(
            alice_lines.next_line().await.unwrap().unwrap(),
            "* the room contains: "
        );

        assert_eq!(bob_lines.next_line().await.unwrap().unwrap(), prompt);
        bob_write.write_all(b"bob\r\n").await.unwrap();
        assert_eq!(
            bob_lines.next_line().await.unwrap().unwrap(),
            "* the room contains: alice"
        );
        assert_eq!(
            alice_lines.next_line().await.unwrap().unwrap(),
            "* bob has entered the room"
        );

        alice_write.write_all(b"hi bob\n").await.unwrap();
        assert_eq!(bob_lines.next_line().await.unwrap().unwrap(), "[alice] hi bob");

        // bob hangs up; alice hears about it and never saw her own message
        bob_write.shutdown().await.unwrap();
        assert_eq!(bob_lines.next_line().await.unwrap(), None);
        bob_worker.await.unwrap().unwrap();
        assert_eq!(
            alice_lines.next_line().await.unwrap().unwrap(),
            "* bob has left the room"
        );

        alice_write.shutdown().await.unwrap();
        assert_eq!(alice_lines.next_line().await.unwrap(), None);
        alice_worker.await.unwrap().unwrap();
        assert!(room.members().is_empty());
    }
}
