//! Chat room protocol implementation.
//!
//! A line-based chat service with one shared room:
//! - Server prompts for a username on connect
//! - Client answers with its name, then sends chat lines
//! - Server relays each line to every other member
//!
//! ## Protocol Format
//!
//! ```text
//! Server:  Welcome to the chat room! What shall I call you?
//! Client:  alice
//! Server:  * the room contains: bob, carol
//! Client:  hi all
//! (bob and carol receive)  [alice] hi all
//! ```
//!
//! Members are told when someone joins (`* alice has entered the room`) or
//! leaves (`* alice has left the room`). Usernames must match
//! `[A-Za-z0-9]{1,16}` and be unique in the room; otherwise the connection
//! is closed without further output and nobody is notified.

pub mod handler;
pub mod room;

pub use handler::ChatSession;
pub use room::Room;
