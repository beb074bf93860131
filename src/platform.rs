//! The three supported platforms and profile-URL handling.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

lazy_static! {
    static ref LEETCODE_USER: Regex =
        Regex::new(r"leetcode\.com/(?:u/|profile/)?([^/?]+)").unwrap();
    static ref CODECHEF_USER: Regex = Regex::new(r"codechef\.com/users/([^/?]+)").unwrap();
    static ref GFG_USER: Regex = Regex::new(r"geeksforgeeks\.org/user/([^/?]+)").unwrap();
}

/// One of the three supported competitive-programming sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Leetcode,
    Codechef,
    Geeksforgeeks,
}

impl Platform {
    pub const ALL: [Platform; 3] = [
        Platform::Leetcode,
        Platform::Codechef,
        Platform::Geeksforgeeks,
    ];

    /// Lowercase identifier used in the roster file and API paths.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Leetcode => "leetcode",
            Platform::Codechef => "codechef",
            Platform::Geeksforgeeks => "geeksforgeeks",
        }
    }

    /// Human-readable name for log lines.
    pub fn label(&self) -> &'static str {
        match self {
            Platform::Leetcode => "LeetCode",
            Platform::Codechef => "CodeChef",
            Platform::Geeksforgeeks => "GeeksforGeeks",
        }
    }

    /// Pull the username out of a profile link. An input that doesn't look
    /// like a URL for this platform is assumed to already be a username.
    pub fn extract_username(&self, link: &str) -> String {
        let re = match self {
            Platform::Leetcode => &*LEETCODE_USER,
            Platform::Codechef => &*CODECHEF_USER,
            Platform::Geeksforgeeks => &*GFG_USER,
        };
        re.captures(link)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| link.trim().trim_end_matches('/').to_string())
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "leetcode" => Ok(Platform::Leetcode),
            "codechef" => Ok(Platform::Codechef),
            "geeksforgeeks" | "gfg" => Ok(Platform::Geeksforgeeks),
            _ => Err(()),
        }
    }
}
