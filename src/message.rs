//! Line protocol definitions
//!
//! Classifies inbound payloads into commands or chat text and builds the
//! outbound text lines. Every outbound line is assembled in a [`Frame`]
//! sized for the worst case of the running configuration.

use std::borrow::Cow;

use crate::error::FrameError;
use crate::frame::Frame;

/// Prefix of the rename command, trailing space included
pub const RENAME_PREFIX: &[u8] = b"/name ";

/// Prefix of the list command
pub const LIST_PREFIX: &[u8] = b"/list";

/// Sent to a connection refused because every slot is taken
pub const SERVER_FULL: &[u8] = b"Server is full. Please try again later.\n";

const WELCOME: &str = "Welcome to the chat server! Your name is: ";
const LIST_HEADER: &str = "Connected users:\n";
const LIST_BULLET: &str = " - ";
const LIST_SELF_MARK: &str = " (you)";

/// Capacity floor for single announcement lines
const LINE_CAPACITY: usize = 128;

/// Client → Server payload
#[derive(Debug, PartialEq, Eq)]
pub enum Inbound<'a> {
    /// `/name <newname>` with the name already extracted and cut to size
    Rename(String),
    /// `/list`
    List,
    /// Anything else
    Chat(&'a [u8]),
}

impl<'a> Inbound<'a> {
    /// Classify one received payload
    pub fn classify(payload: &'a [u8], max_name_len: usize) -> Self {
        if payload.len() > RENAME_PREFIX.len() && payload.starts_with(RENAME_PREFIX) {
            return Inbound::Rename(extract_name(&payload[RENAME_PREFIX.len()..], max_name_len));
        }
        if payload.starts_with(LIST_PREFIX) {
            return Inbound::List;
        }
        Inbound::Chat(payload)
    }
}

/// Take the name up to the first line terminator, cut to `max_len` bytes
fn extract_name(raw: &[u8], max_len: usize) -> String {
    let end = raw
        .iter()
        .position(|&b| b == b'\n' || b == b'\r')
        .unwrap_or(raw.len());
    let mut name = String::from_utf8_lossy(&raw[..end]).into_owned();
    truncate_on_char_boundary(&mut name, max_len);
    name
}

fn truncate_on_char_boundary(s: &mut String, max_len: usize) {
    if s.len() <= max_len {
        return;
    }
    let mut cut = max_len;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    s.truncate(cut);
}

/// Render payload bytes for the operator console
pub fn console_text(bytes: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(bytes)
}

/// Capacity of announcement and welcome lines
pub fn line_capacity(max_name_len: usize) -> usize {
    LINE_CAPACITY.max(2 * max_name_len + WELCOME.len())
}

/// Capacity of a `/list` response for a table of `sessions` slots
pub fn list_capacity(sessions: usize, max_name_len: usize) -> usize {
    LIST_HEADER.len() + sessions * (LIST_BULLET.len() + max_name_len + LIST_SELF_MARK.len() + 1)
}

/// Capacity of a relayed chat line
pub fn chat_capacity(read_limit: usize, max_name_len: usize) -> usize {
    max_name_len + "[] ".len() + read_limit + 1
}

/// Private greeting for a newly admitted session
pub fn welcome(name: &str, capacity: usize) -> Result<Frame, FrameError> {
    let mut frame = Frame::with_capacity(capacity);
    frame.push_str(WELCOME)?.push_str(name)?.push(b"\n")?;
    Ok(frame)
}

/// `*** <name> has joined the chat ***`
pub fn joined(name: &str, capacity: usize) -> Result<Frame, FrameError> {
    announcement(&[name, " has joined the chat"], capacity)
}

/// `*** <name> has left the chat ***`
pub fn left(name: &str, capacity: usize) -> Result<Frame, FrameError> {
    announcement(&[name, " has left the chat"], capacity)
}

/// `*** <old> is now known as <new> ***`
pub fn renamed(old: &str, new: &str, capacity: usize) -> Result<Frame, FrameError> {
    announcement(&[old, " is now known as ", new], capacity)
}

fn announcement(parts: &[&str], capacity: usize) -> Result<Frame, FrameError> {
    let mut frame = Frame::with_capacity(capacity);
    frame.push_str("*** ")?;
    for part in parts {
        frame.push_str(part)?;
    }
    frame.push_str(" ***\n")?;
    Ok(frame)
}

/// Participant listing; each entry is `(name, is_requester)`
pub fn participant_list<'a, I>(entries: I, capacity: usize) -> Result<Frame, FrameError>
where
    I: IntoIterator<Item = (&'a str, bool)>,
{
    let mut frame = Frame::with_capacity(capacity);
    frame.push_str(LIST_HEADER)?;
    for (name, is_requester) in entries {
        frame.push_str(LIST_BULLET)?.push_str(name)?;
        if is_requester {
            frame.push_str(LIST_SELF_MARK)?;
        }
        frame.push(b"\n")?;
    }
    Ok(frame)
}

/// `[name] payload`, ending in exactly the terminator the payload carried
/// or a single appended one
pub fn chat_line(name: &str, payload: &[u8], capacity: usize) -> Result<Frame, FrameError> {
    let mut frame = Frame::with_capacity(capacity);
    frame.push(b"[")?.push_str(name)?.push(b"] ")?.push(payload)?;
    frame.terminate_line()?;
    Ok(frame)
}
