//! Profile link extraction.
//!
//! Accepts the two community profile URL shapes: a numeric `/profiles/<id>`
//! link, which carries the id directly, and a `/id/<vanity>` link, which
//! needs the external resolver to look the name up.

use serde::{Deserialize, Serialize};
use std::fmt;

const HOST: &str = "steamcommunity.com/";
const SCHEMES: &[&str] = &["https://", "http://"];

/// A syntactically valid profile link found in submitted text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProfileLink {
    /// Direct numeric profile id
    Id64(String),
    /// Vanity name needing external resolution
    Vanity(String),
}

impl ProfileLink {
    /// Find the first profile link anywhere in `text`. Returns `None` when
    /// no accepted shape is present.
    pub fn parse(text: &str) -> Option<ProfileLink> {
        let mut search_from = 0;
        while let Some(offset) = text[search_from..].find(HOST) {
            let host_start = search_from + offset;
            if let Some(link) = Self::parse_at(text, host_start) {
                return Some(link);
            }
            search_from = host_start + HOST.len();
        }
        None
    }

    fn parse_at(text: &str, host_start: usize) -> Option<ProfileLink> {
        let prefix = &text[..host_start];
        if !SCHEMES.iter().any(|scheme| prefix.ends_with(scheme)) {
            return None;
        }

        let path = &text[host_start + HOST.len()..];
        if let Some(rest) = path.strip_prefix("profiles/") {
            let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
            if digits.is_empty() {
                return None;
            }
            return Some(ProfileLink::Id64(digits));
        }
        if let Some(rest) = path.strip_prefix("id/") {
            let name: String = rest
                .chars()
                .take_while(|c| !c.is_whitespace() && *c != '/')
                .collect();
            if name.is_empty() {
                return None;
            }
            return Some(ProfileLink::Vanity(name));
        }
        None
    }

    /// The identifying token, independent of link shape
    pub fn key(&self) -> &str {
        match self {
            ProfileLink::Id64(id) => id,
            ProfileLink::Vanity(name) => name,
        }
    }
}

impl fmt::Display for ProfileLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileLink::Id64(id) => write!(f, "profiles/{}", id),
            ProfileLink::Vanity(name) => write!(f, "id/{}", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_profile_link() {
        let link =
            ProfileLink::parse("https://steamcommunity.com/profiles/76561197960287930").unwrap();
        assert_eq!(link, ProfileLink::Id64("76561197960287930".to_string()));
    }

    #[test]
    fn test_vanity_link() {
        let link = ProfileLink::parse("https://steamcommunity.com/id/gabelogannewell").unwrap();
        assert_eq!(link, ProfileLink::Vanity("gabelogannewell".to_string()));
    }

    #[test]
    fn test_plain_http_accepted() {
        let link = ProfileLink::parse("http://steamcommunity.com/profiles/123").unwrap();
        assert_eq!(link, ProfileLink::Id64("123".to_string()));
    }

    #[test]
    fn test_link_embedded_in_message() {
        let link = ProfileLink::parse(
            "here you go: https://steamcommunity.com/profiles/42/ thanks!",
        )
        .unwrap();
        assert_eq!(link, ProfileLink::Id64("42".to_string()));
    }

    #[test]
    fn test_vanity_stops_at_slash_or_space() {
        let link = ProfileLink::parse("https://steamcommunity.com/id/someone/games").unwrap();
        assert_eq!(link, ProfileLink::Vanity("someone".to_string()));
    }

    #[test]
    fn test_missing_scheme_rejected() {
        assert_eq!(ProfileLink::parse("steamcommunity.com/profiles/123"), None);
    }

    #[test]
    fn test_wrong_path_rejected() {
        assert_eq!(
            ProfileLink::parse("https://steamcommunity.com/groups/somegroup"),
            None
        );
    }

    #[test]
    fn test_empty_segments_rejected() {
        assert_eq!(ProfileLink::parse("https://steamcommunity.com/profiles/"), None);
        assert_eq!(ProfileLink::parse("https://steamcommunity.com/id/"), None);
        assert_eq!(
            ProfileLink::parse("https://steamcommunity.com/profiles/abc"),
            None
        );
    }

    #[test]
    fn test_unrelated_text_rejected() {
        assert_eq!(ProfileLink::parse("hello there"), None);
        assert_eq!(ProfileLink::parse(""), None);
    }

    #[test]
    fn test_key_extracts_identifier() {
        assert_eq!(ProfileLink::Id64("99".to_string()).key(), "99");
        assert_eq!(ProfileLink::Vanity("nick".to_string()).key(), "nick");
    }
}
