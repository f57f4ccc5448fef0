// Copyright (c) 2025 Mauka MCP Authors
//
// Licensed under dual license:
// - MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)
// - Apache License, Version 2.0 (LICENSE-APACHE or https://www.apache.org/licenses/LICENSE-2.0)

//! Byte stream primitives used by the tree codec.
//!
//! Values are encoded as follows:
//!
//! | Value              | Encoding                                     |
//! |--------------------|----------------------------------------------|
//! | small int (`i32`)  | signed LEB128                                |
//! | nullable small int | boolean presence flag, then small int        |
//! | boolean            | one byte, `0` or `1`                         |
//! | string             | unsigned LEB128 byte length, then UTF-8      |
//!
//! Signed LEB128 keeps the `-1` end-of-tree sentinel to a single byte.

use std::io::{BufReader, BufWriter, Read, Write};

use crate::config::codec::DEFAULT_MAX_STRING_BYTES;
use crate::error::{CodecError, CodecResult};

/// A sink for codec primitives.
pub trait WriteContext {
    /// Writes a variable-length signed integer.
    fn write_small_int(&mut self, value: i32) -> CodecResult<()>;

    /// Writes a boolean as a single byte.
    fn write_boolean(&mut self, value: bool) -> CodecResult<()>;

    /// Writes a length-prefixed UTF-8 string.
    fn write_string(&mut self, value: &str) -> CodecResult<()>;

    /// Writes an optional small int behind a presence flag.
    fn write_nullable_small_int(&mut self, value: Option<i32>) -> CodecResult<()> {
        match value {
            Some(value) => {
                self.write_boolean(true)?;
                self.write_small_int(value)
            }
            None => self.write_boolean(false),
        }
    }
}

/// A source of codec primitives.
pub trait ReadContext {
    /// Reads a variable-length signed integer.
    fn read_small_int(&mut self) -> CodecResult<i32>;

    /// Reads a single-byte boolean.
    fn read_boolean(&mut self) -> CodecResult<bool>;

    /// Reads a length-prefixed UTF-8 string.
    fn read_string(&mut self) -> CodecResult<String>;

    /// Reads an optional small int written by
    /// [`WriteContext::write_nullable_small_int`].
    fn read_nullable_small_int(&mut self) -> CodecResult<Option<i32>> {
        if self.read_boolean()? {
            self.read_small_int().map(Some)
        } else {
            Ok(None)
        }
    }
}

/// A write context that owns a resource released exactly once by [`close`].
///
/// [`close`]: CloseableWriteContext::close
pub trait CloseableWriteContext: WriteContext {
    /// Flushes pending bytes and releases the underlying resource.
    fn close(self) -> CodecResult<()>;
}

/// A read context that owns a resource released exactly once by [`close`].
///
/// [`close`]: CloseableReadContext::close
pub trait CloseableReadContext: ReadContext {
    /// Releases the underlying resource.
    fn close(self) -> CodecResult<()>;
}

/// Buffered [`WriteContext`] over any [`Write`].
#[derive(Debug)]
pub struct StreamWriter<W: Write> {
    inner: BufWriter<W>,
}

impl<W: Write> StreamWriter<W> {
    /// Creates a writer with the default buffer size.
    pub fn new(inner: W) -> Self {
        Self {
            inner: BufWriter::new(inner),
        }
    }

    /// Creates a writer with the given buffer size.
    pub fn with_capacity(capacity: usize, inner: W) -> Self {
        Self {
            inner: BufWriter::with_capacity(capacity, inner),
        }
    }

    /// Flushes and returns the underlying writer.
    pub fn into_inner(self) -> CodecResult<W> {
        self.inner
            .into_inner()
            .map_err(|e| CodecError::Io(e.into_error()))
    }
}

impl<W: Write> WriteContext for StreamWriter<W> {
    fn write_small_int(&mut self, value: i32) -> CodecResult<()> {
        leb128::write::signed(&mut self.inner, i64::from(value))?;
        Ok(())
    }

    fn write_boolean(&mut self, value: bool) -> CodecResult<()> {
        self.inner.write_all(&[u8::from(value)])?;
        Ok(())
    }

    fn write_string(&mut self, value: &str) -> CodecResult<()> {
        leb128::write::unsigned(&mut self.inner, value.len() as u64)?;
        self.inner.write_all(value.as_bytes())?;
        Ok(())
    }
}

impl<W: Write> CloseableWriteContext for StreamWriter<W> {
    fn close(mut self) -> CodecResult<()> {
        self.inner.flush()?;
        Ok(())
    }
}

/// Buffered [`ReadContext`] over any [`Read`].
#[derive(Debug)]
pub struct StreamReader<R: Read> {
    inner: BufReader<R>,
    max_string_bytes: usize,
}

impl<R: Read> StreamReader<R> {
    /// Creates a reader with the default buffer size and string limit.
    pub fn new(inner: R) -> Self {
        Self {
            inner: BufReader::new(inner),
            max_string_bytes: DEFAULT_MAX_STRING_BYTES,
        }
    }

    /// Creates a reader with the given buffer size.
    pub fn with_capacity(capacity: usize, inner: R) -> Self {
        Self {
            inner: BufReader::with_capacity(capacity, inner),
            max_string_bytes: DEFAULT_MAX_STRING_BYTES,
        }
    }

    /// Sets the largest string payload this reader accepts.
    pub fn with_max_string_bytes(mut self, max_string_bytes: usize) -> Self {
        self.max_string_bytes = max_string_bytes;
        self
    }
}

impl<R: Read> ReadContext for StreamReader<R> {
    fn read_small_int(&mut self) -> CodecResult<i32> {
        let value = leb128::read::signed(&mut self.inner)?;
        i32::try_from(value).map_err(|_| CodecError::ValueOutOfRange {
            value,
            context: "small int",
        })
    }

    fn read_boolean(&mut self) -> CodecResult<bool> {
        let mut byte = [0u8; 1];
        self.inner.read_exact(&mut byte)?;
        match byte[0] {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(CodecError::InvalidBoolean(other)),
        }
    }

    fn read_string(&mut self) -> CodecResult<String> {
        let len = leb128::read::unsigned(&mut self.inner)?;
        if len > self.max_string_bytes as u64 {
            return Err(CodecError::StringTooLong {
                len,
                max: self.max_string_bytes,
            });
        }
        let mut bytes = vec![0u8; len as usize];
        self.inner.read_exact(&mut bytes)?;
        Ok(String::from_utf8(bytes)?)
    }
}

impl<R: Read> CloseableReadContext for StreamReader<R> {
    fn close(self) -> CodecResult<()> {
        drop(self.inner);
        Ok(())
    }
}
