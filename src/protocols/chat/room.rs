//! Shared chat room membership.
//!
//! The room is the only state shared between connections. Joins, leaves and
//! broadcasts all run under one mutex, so every member observes membership
//! changes and messages in the same order. Sending to a member never blocks:
//! it queues bytes on that member's outbox, and the lock is never held
//! across an `.await`.

use crate::runtime::Outbox;
use bytes::{Bytes, BytesMut};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::{debug, info};

type Members = BTreeMap<String, Outbox>;

/// A join attempt was refused.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum JoinError {
    #[error("username '{0}' is already in the room")]
    NameTaken(String),
}

/// Membership registry and broadcast fan-out for one chat room.
#[derive(Debug, Default)]
pub struct Room {
    members: Mutex<Members>,
}

impl Room {
    /// Create an empty room
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Add `name` to the room.
    ///
    /// In one critical section: sends the newcomer the current member
    /// listing, registers it, and announces it to everyone else. The
    /// returned guard removes the member again when dropped.
    pub fn join(self: &Arc<Self>, name: String, outbox: Outbox) -> Result<Membership, JoinError> {
        let mut members = self.lock();

        if members.contains_key(&name) {
            return Err(JoinError::NameTaken(name));
        }

        if outbox.send(welcome_line(&members)).is_err() {
            debug!(user = %name, "Dropped welcome for closed connection");
        }
        members.insert(name.clone(), outbox);
        deliver(
            &members,
            &name,
            Bytes::from(format!("* {name} has entered the room\n")),
        );

        info!(user = %name, members = members.len(), "User joined");

        Ok(Membership {
            room: Arc::clone(self),
            name,
        })
    }

    /// Snapshot of current member names, in sorted order.
    #[cfg(test)]
    pub(crate) fn members(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    fn broadcast(&self, from: &str, message: Bytes) {
        let members = self.lock();
        deliver(&members, from, message);
    }

    fn leave(&self, name: &str) {
        let mut members = self.lock();

        if members.remove(name).is_none() {
            return;
        }
        deliver(
            &members,
            name,
            Bytes::from(format!("* {name} has left the room\n")),
        );

        info!(user = %name, members = members.len(), "User left");
    }

    fn lock(&self) -> MutexGuard<'_, Members> {
        // Critical sections never leave the map half-updated
        self.members.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Queue `message` for every member except `from`.
///
/// A member whose connection already went away is skipped silently.
fn deliver(members: &Members, from: &str, message: Bytes) {
    for (name, outbox) in members {
        if name == from {
            continue;
        }
        if outbox.send(message.clone()).is_err() {
            debug!(user = %name, "Dropped message for closed connection");
        }
    }
}

fn welcome_line(members: &Members) -> Bytes {
    let names: Vec<&str> = members.keys().map(String::as_str).collect();
    Bytes::from(format!("* the room contains: {}\n", names.join(", ")))
}

/// An active member of a [`Room`].
///
/// Dropping the membership leaves the room and announces the departure.
#[derive(Debug)]
pub struct Membership {
    room: Arc<Room>,
    name: String,
}

impl Membership {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Relay a chat line to every other member as `[name] message`.
    pub fn say(&self, message: &[u8]) {
        let mut line = BytesMut::with_capacity(self.name.len() + message.len() + 4);
        line.extend_from_slice(b"[");
        line.extend_from_slice(self.name.as_bytes());
        line.extend_from_slice(b"] ");
        line.extend_from_slice(message);
        line.extend_from_slice(b"\n");

        self.room.broadcast(&self.name, line.freeze());
    }
}

impl Drop for Membership {
    fn drop(&mut self) {
        self.room.leave(&self.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Barrier;
    use std::thread;
    use tokio::sync::mpsc;

    fn connection() -> (Outbox, mpsc::UnboundedReceiver<Bytes>) {
        mpsc::unbounded_channel()
    }

    fn received(queue: &mut mpsc::UnboundedReceiver<Bytes>) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(bytes) = queue.try_recv() {
            lines.push(String::from_utf8(bytes.to_vec()).unwrap());
        }
        lines
    }

    #[test]
    fn test_join_sends_welcome_and_notice() {
        let room = Room::new();
        let (alice_out, mut alice_in) = connection();
        let (bob_out, mut bob_in) = connection();

        let _alice = room.join("alice".to_string(), alice_out).unwrap();
        assert_eq!(received(&mut alice_in), vec!["* the room contains: \n"]);

        let _bob = room.join("bob".to_string(), bob_out).unwrap();
        assert_eq!(received(&mut bob_in), vec!["* the room contains: alice\n"]);
        assert_eq!(
            received(&mut alice_in),
            vec!["* bob has entered the room\n"]
        );
        assert_eq!(room.members(), vec!["alice", "bob"]);
    }

    #[test]
    fn test_say_skips_sender() {
        let room = Room::new();
        let (alice_out, mut alice_in) = connection();
        let (bob_out, mut bob_in) = connection();

        let alice = room.join("alice".to_string(), alice_out).unwrap();
        let _bob = room.join("bob".to_string(), bob_out).unwrap();
        received(&mut alice_in);
        received(&mut bob_in);

        alice.say(b"hello bob");
        assert_eq!(received(&mut bob_in), vec!["[alice] hello bob\n"]);
        assert!(received(&mut alice_in).is_empty());
    }

    #[test]
    fn test_drop_leaves_room() {
        let room = Room::new();
        let (alice_out, mut alice_in) = connection();
        let (bob_out, _bob_in) = connection();

        let _alice = room.join("alice".to_string(), alice_out).unwrap();
        let bob = room.join("bob".to_string(), bob_out).unwrap();
        received(&mut alice_in);

        drop(bob);
        assert_eq!(received(&mut alice_in), vec!["* bob has left the room\n"]);
        assert_eq!(room.members(), vec!["alice"]);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let room = Room::new();
        let (first_out, _first_in) = connection();
        let (second_out, mut second_in) = connection();

        let _first = room.join("alice".to_string(), first_out).unwrap();
        let err = room.join("alice".to_string(), second_out).unwrap_err();

        assert_eq!(err, JoinError::NameTaken("alice".to_string()));
        assert!(received(&mut second_in).is_empty());
        assert_eq!(room.members(), vec!["alice"]);
    }

    #[test]
    fn test_closed_member_does_not_block_delivery() {
        let room = Room::new();
        let (alice_out, alice_in) = connection();
        let (bob_out, mut bob_in) = connection();
        let (carol_out, _carol_in) = connection();

        let _alice = room.join("alice".to_string(), alice_out).unwrap();
        let _bob = room.join("bob".to_string(), bob_out).unwrap();
        let carol = room.join("carol".to_string(), carol_out).unwrap();
        received(&mut bob_in);

        // alice's connection is gone but her membership is still live
        drop(alice_in);
        carol.say(b"anyone?");
        assert_eq!(received(&mut bob_in), vec!["[carol] anyone?\n"]);
    }

    #[test]
    fn test_concurrent_joins_announced_exactly_once() {
        const USERS: usize = 16;

        let room = Room::new();
        let barrier = Arc::new(Barrier::new(USERS));

        let handles: Vec<_> = (0..USERS)
            .map(|i| {
                let room = Arc::clone(&room);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    let name = format!("user{i}");
                    let (outbox, queue) = connection();
                    barrier.wait();
                    let membership = room.join(name.clone(), outbox).unwrap();
                    (name, membership, queue)
                })
            })
            .collect();

        let mut sessions: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let names: Vec<String> = sessions.iter().map(|(name, _, _)| name.clone()).collect();

        for (name, _membership, queue) in sessions.iter_mut() {
            let lines = received(queue);
            let welcome = lines[0]
                .strip_prefix("* the room contains: ")
                .unwrap()
                .trim_end()
                .to_string();
            let listed: Vec<&str> = welcome.split(", ").filter(|s| !s.is_empty()).collect();
            assert!(!listed.contains(&name.as_str()), "{name} listed itself");

            let mut seen: HashMap<&str, usize> = HashMap::new();
            for other in listed.iter().copied() {
                *seen.entry(other).or_default() += 1;
            }
            for line in &lines[1..] {
                let other = line
                    .strip_prefix("* ")
                    .and_then(|rest| rest.strip_suffix(" has entered the room\n"))
                    .unwrap();
                *seen.entry(other).or_default() += 1;
            }

            for other in names.iter().filter(|other| other.as_str() != name.as_str()) {
                assert_eq!(
                    seen.get(other.as_str()).copied(),
                    Some(1),
                    "{name} learned of {other} the wrong number of times"
                );
            }
            assert_eq!(seen.len(), USERS - 1);
        }
    }
}
