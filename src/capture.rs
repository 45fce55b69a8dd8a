//! Output capture
//!
//! Redirects the process's stdout and stderr file descriptors into anonymous
//! temporary files for the duration of one test call, so output written by
//! any means (Rust's `print!`, C libraries, child processes) is attached to
//! the result.
//!
//! The descriptors are process-wide: only one capture may be active at a time.
//! Dropping an unfinished capture still restores the original descriptors.

use std::io;

/// Text written to stdout and stderr while a capture was active.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    pub stdout: String,
    pub stderr: String,
}

/// An active capture of both standard streams.
pub struct OutputCapture {
    stdout: imp::Redirect,
    stderr: imp::Redirect,
}

impl OutputCapture {
    /// Start capturing. Pending buffered output is flushed first.
    pub fn begin() -> io::Result<Self> {
        let stdout = imp::Redirect::begin(imp::Stream::Stdout)?;
        let stderr = imp::Redirect::begin(imp::Stream::Stderr)?;
        Ok(Self { stdout, stderr })
    }

    /// Restore both streams and return what was written.
    pub fn finish(self) -> io::Result<CapturedOutput> {
        let Self { stdout, stderr } = self;
        // Restore stderr first so an error restoring stdout is still visible.
        let stderr = stderr.finish();
        let stdout = stdout.finish();
        Ok(CapturedOutput {
            stdout: stdout?,
            stderr: stderr?,
        })
    }
}

#[cfg(unix)]
mod imp {
    use std::fs::File;
    use std::io::{self, Read, Seek, SeekFrom, Write};
    use std::os::fd::{AsRawFd, RawFd};

    use nix::unistd::{close, dup, dup2};

    #[derive(Debug, Clone, Copy)]
    pub enum Stream {
        Stdout,
        Stderr,
    }

    impl Stream {
        fn fd(self) -> RawFd {
            match self {
                Stream::Stdout => io::stdout().as_raw_fd(),
                Stream::Stderr => io::stderr().as_raw_fd(),
            }
        }

        fn flush(self) -> io::Result<()> {
            match self {
                Stream::Stdout => io::stdout().flush(),
                Stream::Stderr => io::stderr().flush(),
            }
        }
    }

    /// One redirected descriptor.
    pub struct Redirect {
        stream: Stream,
        saved: Option<RawFd>,
        sink: File,
    }

    impl Redirect {
        pub fn begin(stream: Stream) -> io::Result<Self> {
            stream.flush()?;
            let sink = tempfile::tempfile()?;
            let saved = dup(stream.fd())?;
            if let Err(errno) = dup2(sink.as_raw_fd(), stream.fd()) {
                let _ = close(saved);
                return Err(errno.into());
            }
            Ok(Self {
                stream,
                saved: Some(saved),
                sink,
            })
        }

        pub fn finish(mut self) -> io::Result<String> {
            self.restore()?;
            let mut bytes = Vec::new();
            self.sink.seek(SeekFrom::Start(0))?;
            self.sink.read_to_end(&mut bytes)?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }

        fn restore(&mut self) -> io::Result<()> {
            let Some(saved) = self.saved.take() else {
                return Ok(());
            };
            let flushed = self.stream.flush();
            let restored = dup2(saved, self.stream.fd());
            let _ = close(saved);
            restored?;
            flushed
        }
    }

    impl Drop for Redirect {
        fn drop(&mut self) {
            let _ = self.restore();
        }
    }
}

#[cfg(not(unix))]
mod imp {
    use std::io;

    #[derive(Debug, Clone, Copy)]
    pub enum Stream {
        Stdout,
        Stderr,
    }

    pub struct Redirect;

    impl Redirect {
        pub fn begin(_stream: Stream) -> io::Result<Self> {
            Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "output capture requires file-descriptor redirection",
            ))
        }

        pub fn finish(self) -> io::Result<String> {
            Ok(String::new())
        }
    }
}
