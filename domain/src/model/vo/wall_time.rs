use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use super::DescriptorError;

/// A wall-clock limit, whole seconds, never zero.
///
/// Accepts the time formats the SLURM `--time` option does: `minutes`,
/// `minutes:seconds`, `hours:minutes:seconds`, `days-hours`,
/// `days-hours:minutes` and `days-hours:minutes:seconds`. Always renders as
/// `HH:MM:SS`, with the hour field growing past 99 when needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct WallTime(Duration);

impl WallTime {
    pub fn from_secs(secs: u64) -> Result<Self, DescriptorError> {
        if secs == 0 {
            return Err(DescriptorError::ZeroWallTime);
        }
        Ok(Self(Duration::from_secs(secs)))
    }

    pub fn as_duration(&self) -> Duration {
        self.0
    }

    pub fn as_secs(&self) -> u64 {
        self.0.as_secs()
    }
}

impl FromStr for WallTime {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DescriptorError::InvalidWallTime(s.to_owned());
        let field = |x: &str| -> Result<u64, DescriptorError> {
            if x.is_empty() || !x.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            x.parse().map_err(|_| invalid())
        };

        let s = s.trim();
        let (days, rest) = match s.split_once('-') {
            Some((days, rest)) => (field(days)?, rest),
            None => (0, s),
        };
        let parts = rest.split(':').map(field).collect::<Result<Vec<_>, _>>()?;
        let (h, m, sec) = match (s.contains('-'), parts.as_slice()) {
            (true, [h]) => (*h, 0, 0),
            (true, [h, m]) => (*h, *m, 0),
            (false, [m]) => (0, *m, 0),
            (false, [m, sec]) => (0, *m, *sec),
            (_, [h, m, sec]) => (*h, *m, *sec),
            _ => return Err(invalid()),
        };
        let secs = total_secs(days, h, m, sec).ok_or_else(invalid)?;
        Self::from_secs(secs)
    }
}

fn total_secs(days: u64, h: u64, m: u64, sec: u64) -> Option<u64> {
    days.checked_mul(86_400)?
        .checked_add(h.checked_mul(3_600)?)?
        .checked_add(m.checked_mul(60)?)?
        .checked_add(sec)
}

impl TryFrom<String> for WallTime {
    type Error = DescriptorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for WallTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.as_secs();
        write!(f, "{:02}:{:02}:{:02}", secs / 3_600, secs / 60 % 60, secs % 60)
    }
}
