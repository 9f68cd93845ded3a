//! Reply packer
//!
//! Fits `prefix + body` into the timeline's length budget. Length is
//! measured the way the timeline does it:
//! - remote mentions `@user@domain` count as `@user`
//! - grapheme clusters count as one character each
//!
//! The body is read in bounded chunks and is always read to the end, even
//! after the budget is exhausted.

use crate::error::PackError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;
use tokio::io::{AsyncRead, AsyncReadExt};
use unicode_segmentation::UnicodeSegmentation;

/// Maximum perceived length of a status
pub const MAX_STATUS_LENGTH: usize = 500;

/// Size of each body read
pub const READ_CHUNK_SIZE: usize = 512;

/// Longest grapheme cluster, in bytes, the packer will hold
///
/// A longer cluster ends the reply where it starts.
pub const MAX_GRAPHEME_BYTES: usize = 1024;

/// How many graphemes past the budget a partial remote mention may run
/// before the packer gives up on it collapsing back under the budget
const MAX_MENTION_LOOKAHEAD: usize = 256;

static MENTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(@[a-z0-9_]+([a-z0-9_.-]+[a-z0-9_]+)?)@[[:word:].-]+[a-z0-9]+")
        .expect("mention pattern")
});

// Text ending inside `@user@domain`, where more domain characters may still
// shrink the perceived length.
static OPEN_MENTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"@[a-z0-9_][a-z0-9_.-]*@[[:word:].-]*$").expect("open mention pattern")
});

/// Replace remote mentions with their local part
#[must_use]
pub fn collapse_mentions(text: &str) -> Cow<'_, str> {
    if text.contains('@') {
        MENTION.replace_all(text, "$1")
    } else {
        Cow::Borrowed(text)
    }
}

/// Number of characters the timeline will count for `text`
#[must_use]
pub fn perceived_len(text: &str) -> usize {
    collapse_mentions(text).graphemes(true).count()
}

/// Length-bounded reply assembler
#[derive(Debug, Clone, Copy)]
pub struct Packer {
    budget: usize,
}

impl Default for Packer {
    fn default() -> Self {
        Self::new(MAX_STATUS_LENGTH)
    }
}

impl Packer {
    /// Create a packer with the given perceived-length budget
    #[must_use]
    pub fn new(budget: usize) -> Self {
        Self { budget }
    }

    /// Configured budget
    #[inline]
    #[must_use]
    pub fn budget(&self) -> usize {
        self.budget
    }

    /// Pack `prefix` followed by everything `body` yields
    ///
    /// Returns the longest grapheme prefix whose perceived length fits the
    /// budget. A grapheme is only accepted once the byte after it is known,
    /// so clusters split across reads stay whole. Invalid UTF-8 becomes
    /// U+FFFD.
    ///
    /// # Errors
    ///
    /// Returns [`PackError`] when a read fails. The text accepted so far
    /// travels with the error and must not be sent.
    pub async fn pack<R>(&self, prefix: &str, mut body: R) -> Result<String, PackError>
    where
        R: AsyncRead + Unpin,
    {
        let mut assembly = Assembly::new(self.budget);
        let mut tail = String::from(prefix);
        let mut pending = Vec::new();
        let mut buf = [0u8; READ_CHUNK_SIZE];

        if assembly.commit(&mut tail, false) {
            drain(&mut body).await;
            return Ok(assembly.finish());
        }

        loop {
            let n = match body.read(&mut buf).await {
                Ok(n) => n,
                Err(source) => {
                    drain(&mut body).await;
                    return Err(PackError {
                        partial: assembly.finish(),
                        source,
                    });
                }
            };
            let eof = n == 0;
            pending.extend_from_slice(&buf[..n]);
            decode_utf8(&mut pending, &mut tail, eof);

            if assembly.commit(&mut tail, eof) {
                drain(&mut body).await;
                return Ok(assembly.finish());
            }
            if eof {
                return Ok(assembly.finish());
            }
        }
    }
}

/// Text accepted so far
///
/// `text[..fit]` is the longest prefix known to fit. Anything after `fit`
/// is over budget but ends inside a remote mention that may still collapse.
struct Assembly {
    budget: usize,
    text: String,
    fit: usize,
    over: usize,
}

impl Assembly {
    fn new(budget: usize) -> Self {
        Self {
            budget,
            text: String::with_capacity(1024),
            fit: 0,
            over: 0,
        }
    }

    /// Move graphemes from `tail` into the text. The last grapheme of
    /// `tail` stays behind unless `eof`. Returns `true` once no longer
    /// prefix can fit.
    fn commit(&mut self, tail: &mut String, eof: bool) -> bool {
        let mut consumed = 0;
        let mut exhausted = false;
        {
            let mut graphemes = tail.grapheme_indices(true).peekable();
            while let Some((idx, grapheme)) = graphemes.next() {
                let last = graphemes.peek().is_none();
                if grapheme.len() > MAX_GRAPHEME_BYTES {
                    exhausted = true;
                    break;
                }
                if !eof && last {
                    break;
                }
                if !self.accept(grapheme) {
                    exhausted = true;
                    break;
                }
                consumed = idx + grapheme.len();
            }
        }
        if exhausted {
            tail.clear();
        } else {
            tail.drain(..consumed);
        }
        exhausted
    }

    fn accept(&mut self, grapheme: &str) -> bool {
        self.text.push_str(grapheme);
        if perceived_len(&self.text) <= self.budget {
            self.fit = self.text.len();
            self.over = 0;
            return true;
        }
        self.over += 1;
        self.over <= MAX_MENTION_LOOKAHEAD && OPEN_MENTION.is_match(&self.text)
    }

    fn finish(mut self) -> String {
        self.text.truncate(self.fit);
        self.text
    }
}

/// Pack with the default budget
///
/// # Errors
///
/// See [`Packer::pack`].
pub async fn pack<R>(prefix: &str, body: R) -> Result<String, PackError>
where
    R: AsyncRead + Unpin,
{
    Packer::default().pack(prefix, body).await
}

/// Append the decodable part of `pending` to `out`, keeping an incomplete
/// trailing sequence for the next read.
fn decode_utf8(pending: &mut Vec<u8>, out: &mut String, eof: bool) {
    loop {
        match std::str::from_utf8(pending) {
            Ok(s) => {
                out.push_str(s);
                pending.clear();
                return;
            }
            Err(e) => {
                let valid = e.valid_up_to();
                out.push_str(&String::from_utf8_lossy(&pending[..valid]));
                match e.error_len() {
                    Some(len) => {
                        out.push(char::REPLACEMENT_CHARACTER);
                        pending.drain(..valid + len);
                    }
                    None if eof => {
                        out.push(char::REPLACEMENT_CHARACTER);
                        pending.clear();
                        return;
                    }
                    None => {
                        pending.drain(..valid);
                        return;
                    }
                }
            }
        }
    }
}

async fn drain<R: AsyncRead + Unpin>(body: &mut R) {
    if let Err(e) = tokio::io::copy(body, &mut tokio::io::sink()).await {
        tracing::debug!(error = %e, "failed to drain reply body");
    }
}
