// Copyright (C) Microsoft Corporation. All rights reserved.

//! Terminal geometry.

/// Width reported when stdout is not a terminal.
pub const DEFAULT_TERMINAL_WIDTH: u16 = 80;

/// Column count of the terminal on stdout, or [`DEFAULT_TERMINAL_WIDTH`].
pub fn terminal_width() -> u16 {
    terminal_width_or(DEFAULT_TERMINAL_WIDTH)
}

/// Column count of the terminal on stdout, or `default` when stdout is not
/// a terminal or reports zero columns. A zero `default` is replaced by
/// [`DEFAULT_TERMINAL_WIDTH`], so the result is always positive.
pub fn terminal_width_or(default: u16) -> u16 {
    let default = if default == 0 {
        DEFAULT_TERMINAL_WIDTH
    } else {
        default
    };

    match query_width() {
        Some(width) if width > 0 => width,
        _ => default,
    }
}

#[cfg(unix)]
mod sys {
    nix::ioctl_read_bad!(tiocgwinsz, nix::libc::TIOCGWINSZ, nix::libc::winsize);
}

#[cfg(unix)]
fn query_width() -> Option<u16> {
    use std::os::fd::AsRawFd;

    let stdout = std::io::stdout();
    let mut size = nix::libc::winsize {
        ws_row: 0,
        ws_col: 0,
        ws_xpixel: 0,
        ws_ypixel: 0,
    };

    // SAFETY: `size` is a valid winsize for the kernel to fill, and the fd
    // stays open for the duration of the call.
    match unsafe { sys::tiocgwinsz(stdout.as_raw_fd(), &mut size) } {
        Ok(_) => Some(size.ws_col),
        Err(e) => {
            tracing::trace!("TIOCGWINSZ on stdout failed: {e}");
            None
        }
    }
}

#[cfg(windows)]
fn query_width() -> Option<u16> {
    use windows::Win32::System::Console::GetConsoleScreenBufferInfo;
    use windows::Win32::System::Console::GetStdHandle;
    use windows::Win32::System::Console::CONSOLE_SCREEN_BUFFER_INFO;
    use windows::Win32::System::Console::STD_OUTPUT_HANDLE;

    let mut info = CONSOLE_SCREEN_BUFFER_INFO::default();

    // SAFETY: the handle is the process's own stdout and `info` is a valid
    // out parameter.
    let result = unsafe {
        GetStdHandle(STD_OUTPUT_HANDLE)
            .and_then(|handle| GetConsoleScreenBufferInfo(handle, &mut info))
    };
    if let Err(e) = result {
        tracing::trace!("GetConsoleScreenBufferInfo on stdout failed: {e}");
        return None;
    }

    let columns = i32::from(info.srWindow.Right) - i32::from(info.srWindow.Left) + 1;
    u16::try_from(columns).ok()
}

#[cfg(not(any(unix, windows)))]
fn query_width() -> Option<u16> {
    None
}
