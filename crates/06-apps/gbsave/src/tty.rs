//! Serial device nodes as link channels.
//!
//! A terminal is switched at open to byte-at-a-time input without echo, so a
//! single hello byte is delivered as soon as it arrives and nothing the host
//! sends is written back onto the line. The channel's raw bit then controls
//! output post-processing (`OPOST`) only. Closing the channel puts back the
//! settings found at open.
//!
//! Anything that is not a terminal (a FIFO, a plain file) never translates
//! bytes and always reports raw.

use link_protocol::{Channel, ChannelAttrs, LinkError, LinkResult, SerialDriver};
use log::{debug, warn};
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};

/// Opens device nodes by path.
#[derive(Debug, Default)]
pub struct TtyDriver;

impl SerialDriver for TtyDriver {
    type Channel = TtyChannel;

    fn open(&mut self, name: &str) -> LinkResult<TtyChannel> {
        let mut options = OpenOptions::new();
        options.read(true).write(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.custom_flags(libc::O_NOCTTY);
        }
        let file = options
            .open(name)
            .map_err(|err| LinkError::open(name, err))?;
        let line = termios::Line::open(&file).map_err(|err| LinkError::open(name, err))?;
        debug!(
            "opened {name} ({})",
            if line.is_some() { "terminal" } else { "plain file" }
        );
        Ok(TtyChannel {
            file: Some(file),
            line,
        })
    }
}

#[derive(Debug)]
pub struct TtyChannel {
    file: Option<File>,
    line: Option<termios::Line>,
}

impl TtyChannel {
    fn file(&mut self) -> LinkResult<&mut File> {
        self.file.as_mut().ok_or(LinkError::Closed)
    }
}

impl Channel for TtyChannel {
    fn read(&mut self, buf: &mut [u8]) -> LinkResult<usize> {
        Ok(self.file()?.read(buf)?)
    }

    fn write(&mut self, buf: &[u8]) -> LinkResult<usize> {
        Ok(self.file()?.write(buf)?)
    }

    fn attributes(&mut self) -> LinkResult<ChannelAttrs> {
        let raw = self.line.as_ref().map_or(true, termios::Line::is_raw);
        Ok(ChannelAttrs::default().with_raw(raw))
    }

    fn set_attributes(&mut self, attrs: ChannelAttrs) -> LinkResult<()> {
        let Some(file) = self.file.as_ref() else {
            return Err(LinkError::Closed);
        };
        match self.line.as_mut() {
            Some(line) => Ok(line.set_raw(file, attrs.is_raw())?),
            None => Ok(()),
        }
    }

    fn close(&mut self) -> LinkResult<()> {
        let Some(mut file) = self.file.take() else {
            return Ok(());
        };
        let flushed = file.flush();
        let restored = match self.line.as_ref() {
            Some(line) => line.restore(&file),
            None => Ok(()),
        };
        flushed?;
        restored?;
        Ok(())
    }
}

impl Drop for TtyChannel {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!("terminal settings not restored: {err}");
        }
    }
}

#[cfg(unix)]
mod termios {
    use std::fs::File;
    use std::io;
    use std::mem::MaybeUninit;
    use std::os::unix::io::AsRawFd;

    pub struct Line {
        /// Settings found at open.
        original: libc::termios,
        /// Input side switched to byte-at-a-time without echo.
        base: libc::termios,
        raw: bool,
    }

    impl std::fmt::Debug for Line {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("Line").field("raw", &self.raw).finish()
        }
    }

    fn get(file: &File) -> io::Result<libc::termios> {
        let mut attrs = MaybeUninit::<libc::termios>::uninit();
        // SAFETY: tcgetattr fully initialises `attrs` when it returns 0.
        unsafe {
            if libc::tcgetattr(file.as_raw_fd(), attrs.as_mut_ptr()) != 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(attrs.assume_init())
        }
    }

    fn set(file: &File, action: libc::c_int, attrs: &libc::termios) -> io::Result<()> {
        // SAFETY: `attrs` outlives the call and the fd is open.
        if unsafe { libc::tcsetattr(file.as_raw_fd(), action, attrs) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    impl Line {
        /// Captures the current settings and applies the input mode, or
        /// returns `None` for a non-terminal.
        pub fn open(file: &File) -> io::Result<Option<Line>> {
            // SAFETY: the fd stays open for as long as `file` is borrowed.
            if unsafe { libc::isatty(file.as_raw_fd()) } != 1 {
                return Ok(None);
            }
            let original = get(file)?;
            let mut base = original;
            base.c_lflag &= !(libc::ICANON | libc::ECHO | libc::ECHONL | libc::ISIG);
            base.c_iflag &= !(libc::ICRNL | libc::INLCR | libc::IGNCR | libc::IXON);
            base.c_cc[libc::VMIN] = 1;
            base.c_cc[libc::VTIME] = 0;
            set(file, libc::TCSANOW, &base)?;
            Ok(Some(Line {
                raw: base.c_oflag & libc::OPOST == 0,
                original,
                base,
            }))
        }

        pub fn is_raw(&self) -> bool {
            self.raw
        }

        /// Raw clears `OPOST`; otherwise newlines go out as CR LF again.
        pub fn set_raw(&mut self, file: &File, raw: bool) -> io::Result<()> {
            let mut attrs = self.base;
            if raw {
                attrs.c_oflag &= !libc::OPOST;
            } else {
                attrs.c_oflag |= libc::OPOST;
            }
            set(file, libc::TCSADRAIN, &attrs)?;
            self.raw = raw;
            Ok(())
        }

        pub fn restore(&self, file: &File) -> io::Result<()> {
            set(file, libc::TCSADRAIN, &self.original)
        }
    }
}

#[cfg(not(unix))]
mod termios {
    use std::fs::File;
    use std::io;

    #[derive(Debug)]
    pub enum Line {}

    impl Line {
        pub fn open(_file: &File) -> io::Result<Option<Line>> {
            Ok(None)
        }

        pub fn is_raw(&self) -> bool {
            match *self {}
        }

        pub fn set_raw(&mut self, _file: &File, _raw: bool) -> io::Result<()> {
            match *self {}
        }

        pub fn restore(&self, _file: &File) -> io::Result<()> {
            match *self {}
        }
    }
}
