//! Word and sentence framing for the RouterOS API.
//!
//! The API is a stream of *words*, each prefixed with a variable-width
//! length, grouped into *sentences* terminated by a zero-length word.
//! The length prefix grows with the word:
//!
//! | Length            | Encoding                         |
//! |-------------------|----------------------------------|
//! | < 0x80            | 1 byte, as-is                    |
//! | < 0x4000          | 2 bytes, high byte ORed with 0x80 |
//! | < 0x200000        | 3 bytes, high byte ORed with 0xC0 |
//! | < 0x10000000      | 4 bytes, high byte ORed with 0xE0 |
//! | otherwise         | 0xF0 followed by 4 big-endian bytes |
//!
//! Leading bytes of 0xF1 and above are reserved for control and are
//! rejected. Word payloads are not guaranteed to be UTF-8, so decoding
//! is lossy rather than fallible.

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{Error, Result};

/// Longest word this client will buffer, on read or write.
///
/// Log messages are a few hundred bytes; anything in the megabytes means
/// a confused peer or a stream that is out of sync.
pub const MAX_WORD_LEN: u32 = 4 * 1024 * 1024;

/// Append the wire encoding of `length` to `buf`.
pub fn encode_length(length: u32, buf: &mut Vec<u8>) {
    if length < 0x80 {
        buf.push(length as u8);
    } else if length < 0x4000 {
        buf.push((length >> 8) as u8 | 0x80);
        buf.push((length & 0xFF) as u8);
    } else if length < 0x0020_0000 {
        buf.push((length >> 16) as u8 | 0xC0);
        buf.push(((length >> 8) & 0xFF) as u8);
        buf.push((length & 0xFF) as u8);
    } else if length < 0x1000_0000 {
        buf.push((length >> 24) as u8 | 0xE0);
        buf.push(((length >> 16) & 0xFF) as u8);
        buf.push(((length >> 8) & 0xFF) as u8);
        buf.push((length & 0xFF) as u8);
    } else {
        buf.push(0xF0);
        buf.extend_from_slice(&length.to_be_bytes());
    }
}

/// Append one length-prefixed word to `buf`.
///
/// # Errors
///
/// Returns [`Error::WordTooLong`] if the word exceeds [`MAX_WORD_LEN`].
pub fn encode_word(word: &str, buf: &mut Vec<u8>) -> Result<()> {
    let length = u32::try_from(word.len()).unwrap_or(u32::MAX);
    if length > MAX_WORD_LEN {
        return Err(Error::WordTooLong {
            length,
            limit: MAX_WORD_LEN,
        });
    }
    encode_length(length, buf);
    buf.extend_from_slice(word.as_bytes());
    Ok(())
}

/// Encode a full sentence, including the zero-length terminator word.
///
/// # Errors
///
/// Returns [`Error::WordTooLong`] if any word exceeds [`MAX_WORD_LEN`].
pub fn encode_sentence<I, S>(words: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut buf = Vec::new();
    for word in words {
        encode_word(word.as_ref(), &mut buf)?;
    }
    buf.push(0);
    Ok(buf)
}

/// Read one word length from the stream.
///
/// # Errors
///
/// Returns [`Error::Io`] if the stream ends mid-prefix and
/// [`Error::Protocol`] on a reserved control byte.
pub async fn read_length<R>(reader: &mut R) -> Result<u32>
where
    R: AsyncRead + Unpin,
{
    let b0 = u32::from(reader.read_u8().await?);
    if b0 < 0x80 {
        return Ok(b0);
    }
    if b0 < 0xC0 {
        let b1 = u32::from(reader.read_u8().await?);
        return Ok(((b0 & 0x3F) << 8) | b1);
    }
    if b0 < 0xE0 {
        let b1 = u32::from(reader.read_u8().await?);
        let b2 = u32::from(reader.read_u8().await?);
        return Ok(((b0 & 0x1F) << 16) | (b1 << 8) | b2);
    }
    if b0 < 0xF0 {
        let b1 = u32::from(reader.read_u8().await?);
        let b2 = u32::from(reader.read_u8().await?);
        let b3 = u32::from(reader.read_u8().await?);
        return Ok(((b0 & 0x0F) << 24) | (b1 << 16) | (b2 << 8) | b3);
    }
    if b0 == 0xF0 {
        return Ok(reader.read_u32().await?);
    }
    Err(Error::protocol(format!(
        "reserved control byte 0x{b0:02X} where a word length was expected"
    )))
}

/// Read one sentence, stopping at the zero-length terminator word.
///
/// Word payloads are decoded lossily, so invalid UTF-8 from the router
/// becomes replacement characters instead of an error.
///
/// # Errors
///
/// Returns [`Error::Io`] if the stream ends mid-sentence,
/// [`Error::WordTooLong`] if a word exceeds [`MAX_WORD_LEN`], and
/// [`Error::Protocol`] on malformed length prefixes.
pub async fn read_sentence<R>(reader: &mut R) -> Result<Vec<String>>
where
    R: AsyncRead + Unpin,
{
    let mut words = Vec::new();
    loop {
        let length = read_length(reader).await?;
        if length == 0 {
            break;
        }
        if length > MAX_WORD_LEN {
            return Err(Error::WordTooLong {
                length,
                limit: MAX_WORD_LEN,
            });
        }
        let mut bytes = vec![0u8; length as usize];
        reader.read_exact(&mut bytes).await?;
        words.push(String::from_utf8_lossy(&bytes).into_owned());
    }
    Ok(words)
}
