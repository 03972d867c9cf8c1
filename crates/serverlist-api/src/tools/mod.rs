//! External query tools run as subprocesses.
//!
//! Both tools are treated as black boxes: one invocation, one response on
//! stdout, failures signalled through stderr or an empty stdout.

pub mod gamedig;
pub mod gslist;

use std::path::Path;
use std::process::{Output, Stdio};
use std::time::Duration;

use tokio::process::Command;
use tracing::trace;

use crate::error::Error;

pub use gamedig::{Gamedig, GamedigResponse};
pub use gslist::{Gslist, GslistListRequest};

/// Run `program` to completion, killing it once `timeout` elapses.
pub(crate) async fn run(
    program: &Path,
    args: &[String],
    cwd: Option<&Path>,
    timeout: Duration,
) -> Result<Output, Error> {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    trace!(program = %program.display(), ?args, "spawning");

    let child = cmd.spawn().map_err(|e| Error::Subprocess {
        program: program.display().to_string(),
        message: e.to_string(),
    })?;

    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(output) => Ok(output?),
        Err(_) => Err(Error::timeout(timeout)),
    }
}

/// Decode tool output as Latin-1, which never fails.
pub(crate) fn latin1(bytes: &[u8]) -> String {
    bytes.iter().copied().map(char::from).collect()
}

#[cfg(all(test, unix))]
#[allow(clippy::unwrap_used)]
pub(crate) mod test_support {
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;

    /// Write an executable shell script into `dir` and return its path.
    pub(crate) fn script(dir: &tempfile::TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "#!/bin/sh").unwrap();
        file.write_all(body.as_bytes()).unwrap();
        drop(file);
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }
}
