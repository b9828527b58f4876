use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Distribution whose tasks are tracked. Tasks against any other
/// distribution are ignored.
pub const PLATFORM: &str = "Ubuntu";

pub const TRACKED_COUNT: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Series {
    Jammy,
    Impish,
    Hirsute,
    Groovy,
    Focal,
    Bionic,
    Xenial,
    Trusty,
    Precise,
}

impl Series {
    /// The current development series. A task without an explicit series
    /// targets this one.
    pub const DEVEL: Series = Series::Jammy;

    pub const ALL: [Series; 9] = [
        Series::Jammy,
        Series::Impish,
        Series::Hirsute,
        Series::Groovy,
        Series::Focal,
        Series::Bionic,
        Series::Xenial,
        Series::Trusty,
        Series::Precise,
    ];

    /// Series shown as report columns, newest first.
    pub const TRACKED: [Series; TRACKED_COUNT] = [
        Series::DEVEL,
        Series::Impish,
        Series::Hirsute,
        Series::Focal,
        Series::Bionic,
        Series::Xenial,
        Series::Trusty,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Series::Jammy => "Jammy",
            Series::Impish => "Impish",
            Series::Hirsute => "Hirsute",
            Series::Groovy => "Groovy",
            Series::Focal => "Focal",
            Series::Bionic => "Bionic",
            Series::Xenial => "Xenial",
            Series::Trusty => "Trusty",
            Series::Precise => "Precise",
        }
    }

    pub fn version(&self) -> &'static str {
        match self {
            Series::Jammy => "22.04",
            Series::Impish => "21.10",
            Series::Hirsute => "21.04",
            Series::Groovy => "20.10",
            Series::Focal => "20.04",
            Series::Bionic => "18.04",
            Series::Xenial => "16.04",
            Series::Trusty => "14.04",
            Series::Precise => "12.04",
        }
    }

    /// Report column header: the development series is always "Devel".
    pub fn column_name(&self) -> &'static str {
        if *self == Series::DEVEL {
            "Devel"
        } else {
            self.as_str()
        }
    }
}

impl fmt::Display for Series {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Series {
    type Err = ();

    /// An empty name is the development series.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Series::DEVEL);
        }
        Series::ALL.into_iter().find(|x| x.as_str() == s).ok_or(())
    }
}

/// Package of a task whose distribution token is exactly the platform,
/// whatever its series. `"vim (UbuntuX)"` and `"vim (Debian)"` give `None`.
pub fn platform_package(target_name: &str) -> Option<&str> {
    let open = target_name.find(" (")?;
    let distro = target_name[open + 2..]
        .split(|c: char| c == ' ' || c == ')')
        .next()?;
    if distro != PLATFORM {
        return None;
    }
    target_name[..open].split_whitespace().next()
}

/// Split a task target name such as `"systemd (Ubuntu Focal)"` into its
/// package and series. Returns `None` for targets on another distribution,
/// malformed names and unknown series.
pub fn parse_target_name(target_name: &str) -> Option<(&str, Series)> {
    let open = target_name.find(" (")?;
    let package = target_name[..open].split_whitespace().next()?;
    let inner = target_name[open + 2..].strip_suffix(')')?;

    let rest = inner.strip_prefix(PLATFORM)?;
    let series = if rest.is_empty() {
        ""
    } else {
        rest.strip_prefix(' ')?.trim()
    };

    series.parse().ok().map(|s| (package, s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_series_is_devel() {
        assert_eq!(
            parse_target_name("systemd (Ubuntu)"),
            Some(("systemd", Series::DEVEL))
        );
        assert_eq!("".parse::<Series>(), Ok(Series::DEVEL));
    }

    #[test]
    fn explicit_series() {
        assert_eq!(
            parse_target_name("glibc (Ubuntu Focal)"),
            Some(("glibc", Series::Focal))
        );
        assert_eq!(
            parse_target_name("casper (Ubuntu Jammy)"),
            Some(("casper", Series::Jammy))
        );
    }

    #[test]
    fn other_distributions_contribute_nothing() {
        assert_eq!(parse_target_name("vim (Debian)"), None);
        assert_eq!(parse_target_name("vim (Debian Sid)"), None);
        assert_eq!(parse_target_name("vim (UbuntuX)"), None);
    }

    #[test]
    fn platform_token_must_match_exactly() {
        assert_eq!(platform_package("systemd (Ubuntu)"), Some("systemd"));
        assert_eq!(platform_package("glibc (Ubuntu None)"), Some("glibc"));
        assert_eq!(platform_package("vim (UbuntuX)"), None);
        assert_eq!(platform_package("zsh (Ubuntu-rtm)"), None);
        assert_eq!(platform_package("vim (Debian)"), None);
        assert_eq!(platform_package("glibc !@#$)"), None);
    }

    #[test]
    fn unknown_or_malformed_is_rejected() {
        assert_eq!(parse_target_name("glibc (Ubuntu None)"), None);
        assert_eq!(parse_target_name("glibc !@#$)"), None);
        assert_eq!(parse_target_name("glibc"), None);
    }

    #[test]
    fn versions_and_columns() {
        assert_eq!(Series::Focal.version(), "20.04");
        assert_eq!(Series::DEVEL.column_name(), "Devel");
        assert_eq!(Series::Bionic.column_name(), "Bionic");
    }
}
