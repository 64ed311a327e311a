// Controller configuration with an optional text form.
// Same key=value format as the other settings files on the card:
// one pair per line, '#' comments, unknown keys ignored.

use embassy_time::Duration;

// conventional file name, written into the header of the text form
pub const CONFIG_FILE: &str = "CHARGER.TXT";

// upper bound for acquire_timeout_ms; backend transactions are short
pub const MAX_ACQUIRE_TIMEOUT_MS: u16 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChargerConfig {
    pub acquire_timeout_ms: u16, // 0 = wait forever
    pub log_commands: bool,      // log each command: writes at debug, reads at trace
}

impl Default for ChargerConfig {
    fn default() -> Self {
        Self::defaults()
    }
}

impl ChargerConfig {
    pub const fn defaults() -> Self {
        Self {
            acquire_timeout_ms: 0,
            log_commands: true,
        }
    }

    pub fn parse(data: &[u8]) -> Self {
        let mut cfg = Self::defaults();
        for line in data.split(|&b| b == b'\n') {
            let line = line.trim_ascii();
            if line.is_empty() || line[0] == b'#' {
                continue;
            }
            if let Some(eq) = line.iter().position(|&b| b == b'=') {
                let key = line[..eq].trim_ascii();
                let val = line[eq + 1..].trim_ascii();
                cfg.apply(key, val);
            }
        }
        cfg.sanitize();
        cfg
    }

    fn apply(&mut self, key: &[u8], val: &[u8]) {
        match key {
            b"acquire_timeout_ms" => {
                if let Some(v) = parse_u16(val) {
                    self.acquire_timeout_ms = v;
                }
            }
            b"log_commands" => {
                if let Some(v) = parse_u16(val) {
                    self.log_commands = v != 0;
                }
            }
            _ => {} // unknown keys silently ignored for forward compat
        }
    }

    fn sanitize(&mut self) {
        self.acquire_timeout_ms = self.acquire_timeout_ms.min(MAX_ACQUIRE_TIMEOUT_MS);
    }

    /// Serialize to `buf`, returning the number of bytes written.
    /// Output is truncated if `buf` is too small.
    pub fn write(&self, buf: &mut [u8]) -> usize {
        let mut wr = TxtWriter::new(buf);
        wr.put(b"# ");
        wr.put(CONFIG_FILE.as_bytes());
        wr.put(b": charger settings\n");
        wr.put(b"# acquire_timeout_ms=0 waits forever\n\n");
        wr.kv_num(b"acquire_timeout_ms", self.acquire_timeout_ms);
        wr.kv_num(b"log_commands", self.log_commands as u16);
        wr.len()
    }

    pub fn acquire_timeout(&self) -> Option<Duration> {
        match self.acquire_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms as u64)),
        }
    }
}

// plain decimal only: no sign, no inner whitespace
fn parse_u16(s: &[u8]) -> Option<u16> {
    if s.is_empty() || !s.iter().all(u8::is_ascii_digit) {
        return None;
    }
    s.iter()
        .try_fold(0u16, |acc, &b| acc.checked_mul(10)?.checked_add(u16::from(b - b'0')))
}

struct TxtWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> TxtWriter<'a> {
    fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn put(&mut self, data: &[u8]) {
        let n = data.len().min(self.buf.len() - self.pos);
        self.buf[self.pos..self.pos + n].copy_from_slice(&data[..n]);
        self.pos += n;
    }

    fn put_u16(&mut self, val: u16) {
        let mut digits = [0u8; 5];
        let mut i = digits.len();
        let mut v = val;
        loop {
            i -= 1;
            digits[i] = b'0' + (v % 10) as u8;
            v /= 10;
            if v == 0 {
                break;
            }
        }
        self.put(&digits[i..]);
    }

    fn kv_num(&mut self, key: &[u8], val: u16) {
        self.put(key);
        self.put(b"=");
        self.put_u16(val);
        self.put(b"\n");
    }

    fn len(&self) -> usize {
        self.pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_gives_defaults() {
        assert_eq!(ChargerConfig::parse(b""), ChargerConfig::defaults());
        assert_eq!(ChargerConfig::defaults().acquire_timeout(), None);
    }

    #[test]
    fn parses_keys_comments_and_whitespace() {
        let txt = b"# comment\r\n  acquire_timeout_ms = 250\r\nlog_commands=0\nbogus=12\n";
        let cfg = ChargerConfig::parse(txt);
        assert_eq!(cfg.acquire_timeout_ms, 250);
        assert!(!cfg.log_commands);
        assert_eq!(cfg.acquire_timeout(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn bad_values_are_ignored_and_large_ones_clamped() {
        let cfg = ChargerConfig::parse(b"acquire_timeout_ms=-4\nlog_commands=yes\n");
        assert_eq!(cfg, ChargerConfig::defaults());

        let cfg = ChargerConfig::parse(b"acquire_timeout_ms=+5\nlog_commands=0 1\n");
        assert_eq!(cfg, ChargerConfig::defaults());

        let cfg = ChargerConfig::parse(b"acquire_timeout_ms=60000\n");
        assert_eq!(cfg.acquire_timeout_ms, MAX_ACQUIRE_TIMEOUT_MS);
    }

    #[test]
    fn written_text_parses_back() {
        let cfg = ChargerConfig {
            acquire_timeout_ms: 40,
            log_commands: false,
        };
        let mut buf = [0u8; 128];
        let n = cfg.write(&mut buf);
        let text = core::str::from_utf8(&buf[..n]).unwrap();
        assert!(text.starts_with("# CHARGER.TXT: charger settings\n"));
        assert!(text.contains("acquire_timeout_ms=40\n"));
        assert!(text.contains("log_commands=0\n"));
        assert_eq!(ChargerConfig::parse(&buf[..n]), cfg);
    }
}
