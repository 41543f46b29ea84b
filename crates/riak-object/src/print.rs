// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Bounded debug rendering.
//!
//! Renderers write into a caller-supplied byte buffer with `snprintf`
//! semantics: at most `len - 1` content bytes followed by a NUL terminator,
//! and the return value is the length the complete rendering needs. A return
//! value `>= len` means the output was truncated.
//!
//! Each field is formatted into a fixed [`SCRATCH_LEN`] byte scratch buffer
//! before it is appended, so a single field contributes at most
//! `SCRATCH_LEN - 1` bytes. No heap allocation happens while printing.

use std::fmt::{self, Write as _};

use time::macros::format_description;
use time::OffsetDateTime;

use crate::allocator::Allocator;
use crate::binary::Binary;
use crate::link::Link;
use crate::object::Object;
use crate::pair::Pair;

/// Size of the per-field scratch buffer.
pub const SCRATCH_LEN: usize = 2048;

/// Writer over a fixed byte buffer that never writes past its end.
///
/// Counts every byte offered to it, stores only what fits in front of the
/// terminator slot.
pub struct BoundedWriter<'a> {
    buf: &'a mut [u8],
    written: usize,
    total: usize,
}

impl<'a> BoundedWriter<'a> {
    /// Wrap `buf`.
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self {
            buf,
            written: 0,
            total: 0,
        }
    }

    /// Append raw bytes, truncating at capacity.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.total = self.total.saturating_add(bytes.len());
        let capacity = self.buf.len().saturating_sub(1);
        let room = capacity.saturating_sub(self.written);
        let n = room.min(bytes.len());
        self.buf[self.written..self.written + n].copy_from_slice(&bytes[..n]);
        self.written += n;
    }

    /// Bytes actually stored so far (excluding the terminator).
    pub fn written(&self) -> usize {
        self.written
    }

    /// Bytes offered so far, stored or not.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Terminate the output and return the full logical length.
    pub fn finish(self) -> usize {
        if let Some(slot) = self.buf.get_mut(self.written) {
            *slot = 0;
        }
        self.total
    }
}

impl fmt::Write for BoundedWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.write_bytes(s.as_bytes());
        Ok(())
    }
}

impl std::io::Write for BoundedWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.write_bytes(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Append `label: <field>\n`, formatting the field through a scratch buffer.
fn field_line(
    out: &mut BoundedWriter<'_>,
    label: &str,
    render: impl FnOnce(&mut BoundedWriter<'_>) -> fmt::Result,
) -> fmt::Result {
    let mut scratch = [0u8; SCRATCH_LEN];
    let mut field = BoundedWriter::new(&mut scratch);
    render(&mut field)?;
    let len = field.written();
    out.write_str(label)?;
    out.write_str(": ")?;
    out.write_bytes(&scratch[..len]);
    out.write_char('\n')
}

fn binary_line<A: Allocator>(out: &mut BoundedWriter<'_>, label: &str, bin: Option<&Binary<A>>) -> fmt::Result {
    field_line(out, label, |w| bin.map_or(Ok(()), |b| b.render(w)))
}

/// Render a Unix timestamp as `YYYY-MM-DD HH:MM:SS` (UTC).
fn render_timestamp(w: &mut BoundedWriter<'_>, secs: u32) -> fmt::Result {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let formatted = OffsetDateTime::from_unix_timestamp(i64::from(secs))
        .ok()
        .and_then(|ts| ts.format_into(w, format).ok());
    match formatted {
        Some(_) => Ok(()),
        None => write!(w, "{secs}"),
    }
}

pub(crate) fn render_link<A: Allocator>(link: &Link<A>, out: &mut BoundedWriter<'_>) -> fmt::Result {
    if link.has_bucket() {
        binary_line(out, "Link buffer", link.bucket())?;
    }
    if link.has_key() {
        binary_line(out, "Link Key", link.key())?;
    }
    if link.has_tag() {
        binary_line(out, "Link Tag", link.tag())?;
    }
    Ok(())
}

pub(crate) fn render_object<A: Allocator>(obj: &Object<A>, out: &mut BoundedWriter<'_>) -> fmt::Result {
    binary_line(out, "Bucket", obj.bucket())?;
    if obj.has_key() {
        binary_line(out, "Key", obj.key())?;
    }
    // TODO: value rendering is capped at SCRATCH_LEN; large values need a
    // streaming path straight into `out`.
    binary_line(out, "Value", obj.value())?;
    if obj.has_charset() {
        binary_line(out, "Charset", obj.charset())?;
    }
    if let Some(secs) = obj.last_mod() {
        field_line(out, "Last Mod", |w| render_timestamp(w, secs))?;
    }
    if let Some(usecs) = obj.last_mod_usecs() {
        field_line(out, "Last Mod uSecs", |w| write!(w, "{usecs}"))?;
    }
    if obj.has_content_type() {
        binary_line(out, "Content Type", obj.content_type())?;
    }
    if obj.has_content_encoding() {
        binary_line(out, "Content Encoding", obj.encoding())?;
    }
    if let Some(deleted) = obj.deleted() {
        field_line(out, "Deleted", |w| w.write_str(if deleted { "true" } else { "false" }))?;
    }
    if obj.has_vtag() {
        binary_line(out, "VTag", obj.vtag())?;
    }
    for link in obj.links() {
        render_link(link, out)?;
    }
    Ok(())
}

pub(crate) fn render_pairs<A: Allocator>(pairs: &[Pair<A>], out: &mut BoundedWriter<'_>) -> fmt::Result {
    for pair in pairs {
        binary_line(out, "key", pair.key())?;
        if pair.has_value() {
            binary_line(out, "value", pair.value())?;
        }
    }
    Ok(())
}

/// Render every pair in `pairs` into `buf` as `key:` / `value:` lines.
///
/// Same bounded semantics as [`Object::print`].
pub fn print_pairs<A: Allocator>(pairs: &[Pair<A>], buf: &mut [u8]) -> usize {
    let mut out = BoundedWriter::new(buf);
    // BoundedWriter never fails; truncation is reported through the total.
    let _ = render_pairs(pairs, &mut out);
    out.finish()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::fmt::Write as _;

    #[test]
    fn writer_truncates_and_terminates() {
        let mut buf = [0xAAu8; 4];
        let mut w = BoundedWriter::new(&mut buf);
        w.write_str("hello").unwrap();
        assert_eq!(w.written(), 3);
        assert_eq!(w.finish(), 5);
        assert_eq!(&buf, b"hel\0");
    }

    #[test]
    fn zero_length_buffer_is_untouched() {
        let mut buf = [0u8; 0];
        let mut w = BoundedWriter::new(&mut buf);
        w.write_str("abc").unwrap();
        assert_eq!(w.finish(), 3);
    }

    #[test]
    fn scratch_caps_a_single_field() {
        let mut buf = vec![0u8; SCRATCH_LEN * 2];
        let mut out = BoundedWriter::new(&mut buf);
        field_line(&mut out, "X", |w| {
            for _ in 0..SCRATCH_LEN * 2 {
                w.write_char('a')?;
            }
            Ok(())
        })
        .unwrap();
        // "X: " + (SCRATCH_LEN - 1) bytes + "\n"
        assert_eq!(out.finish(), 3 + SCRATCH_LEN - 1 + 1);
    }

    #[test]
    fn timestamp_renders_utc() {
        let mut buf = [0u8; 32];
        let mut w = BoundedWriter::new(&mut buf);
        render_timestamp(&mut w, 1_400_000_000).unwrap();
        let n = w.finish();
        assert_eq!(&buf[..n], b"2014-05-13 16:53:20");
    }
}
