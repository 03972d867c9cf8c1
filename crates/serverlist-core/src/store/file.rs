// ── List file persistence ──
//
// One JSON array per game, loaded leniently and rewritten in full through a
// temp file in the same directory so a crash never leaves a truncated list.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use serde_json::ser::{Formatter, PrettyFormatter};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::list::ServerList;
use crate::error::CoreError;
use crate::model::Server;

/// `{dir}/{game}-servers.json`
pub fn list_path(dir: &Path, game: &str) -> PathBuf {
    dir.join(format!("{game}-servers.json"))
}

/// Load a list file. A missing file is an empty list; a file that is not a
/// JSON array is fatal; individual records that do not parse are skipped.
pub fn load<T: Server>(path: &Path) -> Result<ServerList<T>, CoreError> {
    let load_err = |reason: String| CoreError::ListLoad {
        path: path.display().to_string(),
        reason,
    };

    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no existing server list");
            return Ok(ServerList::new());
        }
        Err(e) => return Err(load_err(e.to_string())),
    };

    let records: Vec<Value> = serde_json::from_str(&raw).map_err(|e| load_err(e.to_string()))?;
    let total = records.len();
    let list: ServerList<T> = records
        .into_iter()
        .enumerate()
        .filter_map(|(index, record)| match serde_json::from_value::<T>(record) {
            Ok(server) => Some(server),
            Err(e) => {
                warn!(index, error = %e, "skipping unreadable server record");
                None
            }
        })
        .collect();

    debug!(path = %path.display(), total, loaded = list.len(), "loaded server list");
    Ok(list)
}

/// Atomically replace the list file with `list`.
///
/// With `ensure_ascii` every non-ASCII character is written as a `\uXXXX`
/// escape, matching what existing consumers of the files expect.
pub fn save<T: Server>(path: &Path, list: &ServerList<T>, ensure_ascii: bool) -> Result<(), CoreError> {
    let write_err = |reason: String| CoreError::ListWrite {
        path: path.display().to_string(),
        reason,
    };

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| write_err(e.to_string()))?;

    let written = if ensure_ascii {
        write_json(&mut tmp, list, AsciiPretty::default())
    } else {
        write_json(&mut tmp, list, PrettyFormatter::with_indent(b"  "))
    };
    written
        .and_then(|()| tmp.flush())
        .map_err(|e| write_err(e.to_string()))?;

    tmp.persist(path).map_err(|e| write_err(e.error.to_string()))?;
    debug!(path = %path.display(), servers = list.len(), "wrote server list");
    Ok(())
}

fn write_json<W: Write, F: Formatter, T: Serialize>(writer: W, value: &T, formatter: F) -> io::Result<()> {
    let mut ser = serde_json::Serializer::with_formatter(writer, formatter);
    value.serialize(&mut ser).map_err(io::Error::from)
}

// ── ASCII-escaping pretty printer ───────────────────────────────────

/// Pretty printer (two-space indent) that escapes non-ASCII characters as
/// UTF-16 `\uXXXX` sequences.
struct AsciiPretty {
    inner: PrettyFormatter<'static>,
}

impl Default for AsciiPretty {
    fn default() -> Self {
        Self {
            inner: PrettyFormatter::with_indent(b"  "),
        }
    }
}

impl Formatter for AsciiPretty {
    fn write_string_fragment<W: ?Sized + Write>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()> {
        let mut start = 0;
        for (i, c) in fragment.char_indices() {
            if c.is_ascii() {
                continue;
            }
            writer.write_all(fragment.get(start..i).unwrap_or_default().as_bytes())?;
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                write!(writer, "\\u{unit:04x}")?;
            }
            start = i + c.len_utf8();
        }
        writer.write_all(fragment.get(start..).unwrap_or_default().as_bytes())
    }

    fn begin_array<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_array(writer)
    }

    fn end_array<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_array(writer)
    }

    fn begin_array_value<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.inner.begin_array_value(writer, first)
    }

    fn end_array_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_array_value(writer)
    }

    fn begin_object<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_object(writer)
    }

    fn end_object<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object(writer)
    }

    fn begin_object_key<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.inner.begin_object_key(writer, first)
    }

    fn begin_object_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_object_value(writer)
    }

    fn end_object_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object_value(writer)
    }
}
