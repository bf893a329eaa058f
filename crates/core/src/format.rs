//! Line header rendering
//!
//! A rendered line is `prefix + header + message`, newline-terminated. The
//! header is assembled from [`FormatFlags`]:
//!
//! ```text
//! [2009/01/23 ][01:23:23[.123123] ][main.rs:23: ]
//! ```

use chrono::{DateTime, Datelike, Local, NaiveDateTime, Timelike};
use std::fmt::Write as _;
use std::ops::{BitOr, BitOrAssign};
use std::panic::Location;

/// Header flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FormatFlags(u32);

impl FormatFlags {
    /// No header at all
    pub const NONE: FormatFlags = FormatFlags(0);
    /// Local date: `2009/01/23`
    pub const DATE: FormatFlags = FormatFlags(1);
    /// Local time: `01:23:23`
    pub const TIME: FormatFlags = FormatFlags(1 << 1);
    /// Microsecond resolution: `01:23:23.123123`. Implies `TIME`.
    pub const MICROSECONDS: FormatFlags = FormatFlags(1 << 2);
    /// Full file path and line number: `/a/b/c.rs:23`
    pub const LONG_FILE: FormatFlags = FormatFlags(1 << 3);
    /// Final path element and line number: `c.rs:23`. Overrides `LONG_FILE`.
    pub const SHORT_FILE: FormatFlags = FormatFlags(1 << 4);
    /// Render date and time in UTC instead of local time
    pub const UTC: FormatFlags = FormatFlags(1 << 5);

    /// Date and time
    pub const STD: FormatFlags = FormatFlags(Self::DATE.0 | Self::TIME.0);
    /// Preset for timestamp-only loggers
    pub const FLAG_DATE: FormatFlags = Self::STD;
    /// Preset used by the process-wide logger: timestamp plus `file:line`
    pub const FLAG_NORMAL: FormatFlags =
        FormatFlags(Self::DATE.0 | Self::TIME.0 | Self::SHORT_FILE.0);

    /// Raw bits.
    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Build from raw bits, dropping unknown ones.
    pub const fn from_bits_truncate(bits: u32) -> Self {
        FormatFlags(bits & 0b11_1111)
    }

    /// True if every flag in `other` is set.
    #[inline]
    pub const fn contains(self, other: FormatFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// True if any flag in `other` is set.
    #[inline]
    pub const fn intersects(self, other: FormatFlags) -> bool {
        self.0 & other.0 != 0
    }

    /// True if the header carries a source location.
    #[inline]
    pub const fn wants_location(self) -> bool {
        self.intersects(FormatFlags(Self::LONG_FILE.0 | Self::SHORT_FILE.0))
    }
}

impl BitOr for FormatFlags {
    type Output = FormatFlags;

    fn bitor(self, rhs: FormatFlags) -> FormatFlags {
        FormatFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for FormatFlags {
    fn bitor_assign(&mut self, rhs: FormatFlags) {
        self.0 |= rhs.0;
    }
}

/// Final path element of `file`.
pub fn short_file(file: &str) -> &str {
    match file.rfind(['/', '\\']) {
        Some(idx) => &file[idx + 1..],
        None => file,
    }
}

/// Prefix and header flags of one log stream.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LineFormat {
    /// Text written before the header of every line
    pub prefix: String,
    /// Header flags
    pub flags: FormatFlags,
}

impl LineFormat {
    /// Create a format.
    pub fn new(prefix: impl Into<String>, flags: FormatFlags) -> Self {
        Self {
            prefix: prefix.into(),
            flags,
        }
    }

    /// Render one complete line.
    pub fn render(
        &self,
        now: DateTime<Local>,
        location: Option<&Location<'_>>,
        msg: &str,
    ) -> String {
        let mut buf = String::with_capacity(self.prefix.len() + 48 + msg.len());
        buf.push_str(&self.prefix);
        self.write_header(&mut buf, now, location);
        buf.push_str(msg);
        if !msg.ends_with('\n') {
            buf.push('\n');
        }
        buf
    }

    /// Append the header (without prefix) to `buf`.
    pub fn write_header(
        &self,
        buf: &mut String,
        now: DateTime<Local>,
        location: Option<&Location<'_>>,
    ) {
        let flags = self.flags;
        let clock_flags = FormatFlags::DATE | FormatFlags::TIME | FormatFlags::MICROSECONDS;
        if flags.intersects(clock_flags) {
            let t: NaiveDateTime = if flags.contains(FormatFlags::UTC) {
                now.naive_utc()
            } else {
                now.naive_local()
            };
            // Writing into a String cannot fail.
            if flags.contains(FormatFlags::DATE) {
                let _ = write!(buf, "{:04}/{:02}/{:02} ", t.year(), t.month(), t.day());
            }
            if flags.intersects(FormatFlags::TIME | FormatFlags::MICROSECONDS) {
                let _ = write!(buf, "{:02}:{:02}:{:02}", t.hour(), t.minute(), t.second());
                if flags.contains(FormatFlags::MICROSECONDS) {
                    let micros = (t.nanosecond() / 1_000) % 1_000_000;
                    let _ = write!(buf, ".{:06}", micros);
                }
                buf.push(' ');
            }
        }
        if flags.wants_location() {
            let (file, line) = match location {
                Some(loc) => (loc.file(), loc.line()),
                None => ("???", 0),
            };
            let file = if flags.contains(FormatFlags::SHORT_FILE) {
                short_file(file)
            } else {
                file
            };
            let _ = write!(buf, "{}:{}: ", file, line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2009, 1, 23, 1, 23, 23)
            .single()
            .unwrap()
    }

    #[test]
    fn test_flag_presets() {
        assert!(FormatFlags::FLAG_NORMAL.contains(FormatFlags::SHORT_FILE));
        assert!(FormatFlags::FLAG_NORMAL.contains(FormatFlags::STD));
        assert!(!FormatFlags::FLAG_DATE.wants_location());
        assert_eq!(
            FormatFlags::from_bits_truncate(FormatFlags::FLAG_NORMAL.bits() | 1 << 12),
            FormatFlags::FLAG_NORMAL
        );
    }

    #[test]
    fn test_short_file() {
        assert_eq!(short_file("/a/b/c.rs"), "c.rs");
        assert_eq!(short_file("src\\main.rs"), "main.rs");
        assert_eq!(short_file("lib.rs"), "lib.rs");
    }

    #[test]
    fn test_render_without_header() {
        let format = LineFormat::new("", FormatFlags::NONE);
        assert_eq!(format.render(fixed_time(), None, "INFO  hello"), "INFO  hello\n");
        assert_eq!(format.render(fixed_time(), None, "done\n"), "done\n");
    }

    #[test]
    fn test_render_date_and_time() {
        let format = LineFormat::new("", FormatFlags::STD);
        let line = format.render(fixed_time(), None, "WARN  disk low");
        assert_eq!(line, "2009/01/23 01:23:23 WARN  disk low\n");
    }

    #[test]
    fn test_render_microseconds_implies_time() {
        let format = LineFormat::new("", FormatFlags::MICROSECONDS);
        let line = format.render(fixed_time(), None, "x");
        assert_eq!(line, "01:23:23.000000 x\n");
    }

    #[test]
    fn test_render_short_file_overrides_long() {
        let here = Location::caller();
        let format = LineFormat::new(
            "> ",
            FormatFlags::LONG_FILE | FormatFlags::SHORT_FILE,
        );
        let line = format.render(fixed_time(), Some(here), "msg");
        assert_eq!(line, format!("> format.rs:{}: msg\n", here.line()));
    }

    #[test]
    fn test_render_long_file() {
        let here = Location::caller();
        let format = LineFormat::new("", FormatFlags::LONG_FILE);
        let line = format.render(fixed_time(), Some(here), "msg");
        assert!(line.starts_with(here.file()));
    }

    #[test]
    fn test_render_unknown_location() {
        let format = LineFormat::new("", FormatFlags::SHORT_FILE);
        assert_eq!(format.render(fixed_time(), None, "m"), "???:0: m\n");
    }
}
