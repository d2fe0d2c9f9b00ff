//! RouterOS API wire framing.
//!
//! The protocol exchanges *sentences*: sequences of length-prefixed byte
//! strings (*words*) terminated by a zero-length word. Word lengths use a
//! variable 1-5 byte big-endian encoding where the high bits of the first
//! byte select the width.
//!
//! Requests start with a command word (`/ip/dns/static/print`) followed by
//! attribute words (`=name=value`) and query words (`?name=value`). Replies
//! start with `!re` (data), `!done` (final), `!trap` (error) or `!fatal`
//! (connection teardown).

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use mikrodns_core::error::{Error, Result};

/// Upper bound on an inbound word; anything larger is treated as a framing
/// error rather than an allocation request.
pub const MAX_WORD_LEN: u32 = 4 * 1024 * 1024;

/// Classification of a reply sentence's leading word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    /// `!re`: one item of reply data
    Data,
    /// `!done`: the command finished
    Done,
    /// `!trap`: the command failed; detail in the `message` attribute
    Trap,
    /// `!fatal`: the router is closing the connection
    Fatal,
}

/// One protocol sentence
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sentence {
    words: Vec<String>,
}

impl Sentence {
    /// Start a sentence with a command (or reply) word
    pub fn command(word: impl Into<String>) -> Self {
        Self {
            words: vec![word.into()],
        }
    }

    /// Append an `=key=value` attribute word
    pub fn attribute(mut self, key: &str, value: impl AsRef<str>) -> Self {
        self.words.push(format!("={}={}", key, value.as_ref()));
        self
    }

    /// Append a `?key=value` equality query word
    pub fn query(mut self, key: &str, value: impl AsRef<str>) -> Self {
        self.words.push(format!("?{}={}", key, value.as_ref()));
        self
    }

    /// All words in order
    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// The leading word, if any
    pub fn first(&self) -> Option<&str> {
        self.words.first().map(String::as_str)
    }

    /// True for a sentence with no words (the protocol's keepalive shape)
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Classify the leading reply word
    pub fn reply_kind(&self) -> Option<ReplyKind> {
        match self.first()? {
            "!re" => Some(ReplyKind::Data),
            "!done" => Some(ReplyKind::Done),
            "!trap" => Some(ReplyKind::Trap),
            "!fatal" => Some(ReplyKind::Fatal),
            _ => None,
        }
    }

    /// Value of the `=key=value` attribute word for `key`, if present
    pub fn attribute_value(&self, key: &str) -> Option<&str> {
        let prefix = format!("={key}=");
        self.words
            .iter()
            .find_map(|word| word.strip_prefix(prefix.as_str()))
    }

    /// Value of the `?key=value` query word for `key`, if present
    pub fn query_value(&self, key: &str) -> Option<&str> {
        let prefix = format!("?{key}=");
        self.words
            .iter()
            .find_map(|word| word.strip_prefix(prefix.as_str()))
    }
}

/// Append the variable-width encoding of a word length
pub fn encode_length(len: u32, buf: &mut Vec<u8>) {
    if len < 0x80 {
        buf.push(len as u8);
    } else if len < 0x4000 {
        buf.extend_from_slice(&(len | 0x8000).to_be_bytes()[2..]);
    } else if len < 0x20_0000 {
        buf.extend_from_slice(&(len | 0xC0_0000).to_be_bytes()[1..]);
    } else if len < 0x1000_0000 {
        buf.extend_from_slice(&(len | 0xE000_0000).to_be_bytes());
    } else {
        buf.push(0xF0);
        buf.extend_from_slice(&len.to_be_bytes());
    }
}

/// Read one variable-width word length
pub async fn read_length<R: AsyncRead + Unpin>(reader: &mut R) -> Result<u32> {
    let first = reader.read_u8().await?;
    let (extra_bytes, mut len) = match first {
        b if b & 0x80 == 0x00 => (0u8, b as u32),
        b if b & 0xC0 == 0x80 => (1, (b & 0x3F) as u32),
        b if b & 0xE0 == 0xC0 => (2, (b & 0x1F) as u32),
        b if b & 0xF0 == 0xE0 => (3, (b & 0x0F) as u32),
        0xF0 => (4, 0),
        b => {
            return Err(Error::protocol(format!(
                "invalid length prefix byte {b:#04x}"
            )));
        }
    };

    for _ in 0..extra_bytes {
        len = (len << 8) | reader.read_u8().await? as u32;
    }
    Ok(len)
}

/// Read one word; `None` marks the end of the sentence
async fn read_word<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Option<String>> {
    let len = read_length(reader).await?;
    if len == 0 {
        return Ok(None);
    }
    if len > MAX_WORD_LEN {
        return Err(Error::protocol(format!(
            "word of {len} bytes exceeds the {MAX_WORD_LEN} byte limit"
        )));
    }

    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf).await?;
    Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
}

/// Read one full sentence (possibly empty)
pub async fn read_sentence<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Sentence> {
    let mut words = Vec::new();
    while let Some(word) = read_word(reader).await? {
        words.push(word);
    }
    Ok(Sentence { words })
}

/// Write one sentence, including its terminating zero-length word
pub async fn write_sentence<W: AsyncWrite + Unpin>(
    writer: &mut W,
    sentence: &Sentence,
) -> Result<()> {
    let mut buf = Vec::new();
    for word in sentence.words() {
        encode_length(word.len() as u32, &mut buf);
        buf.extend_from_slice(word.as_bytes());
    }
    buf.push(0);

    writer.write_all(&buf).await?;
    writer.flush().await?;
    Ok(())
}
