//! Thread model: posts grouped by author
//!
//! # Examples
//!
//! ```rust
//! use vbulletin_bbcode::thread::parse_thread_reference;
//!
//! assert_eq!(parse_thread_reference("4521").unwrap(), 4521);
//! assert_eq!(
//!     parse_thread_reference("https://forums.example.com/showthread.php?t=4521").unwrap(),
//!     4521
//! );
//! assert!(parse_thread_reference("forum.php").is_err());
//! ```

use markup5ever_rcdom::RcDom;
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

use crate::error::ExtractionError;
use crate::post::{ForumPost, PostExtractor};

/// Number of the post that opens a thread
const OPENING_POST: u32 = 1;

/// Parse a thread number or a `showthread.php` / `printthread.php` URL
///
/// # Errors
///
/// [`ExtractionError::InvalidThreadReference`] for anything else,
/// including ids that do not fit in a `u64`.
pub fn parse_thread_reference(reference: &str) -> Result<u64, ExtractionError> {
    static URL_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    let regex = URL_REGEX.get_or_init(|| {
        Regex::new(r"^https?://[^/\s]+/(?:[^\s?]*/)?(?:show|print)thread\.php\?(?:t=)?(\d+)").ok()
    });

    let reference = reference.trim();
    let digits = if !reference.is_empty() && reference.bytes().all(|b| b.is_ascii_digit()) {
        Some(reference)
    } else {
        regex
            .as_ref()
            .and_then(|regex| regex.captures(reference))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    };

    digits
        .and_then(|digits| digits.parse().ok())
        .ok_or_else(|| ExtractionError::InvalidThreadReference(reference.to_string()))
}

/// A thread's posts, ordered by post number
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Thread {
    id: u64,
    posts: Vec<ForumPost>,
}

impl Thread {
    /// Build a thread from already extracted posts
    pub fn from_posts(id: u64, mut posts: Vec<ForumPost>) -> Self {
        posts.sort_by_key(|post| post.number);
        Self { id, posts }
    }

    /// Extract the posts of a parsed page into a thread
    pub fn from_dom(id: u64, dom: &RcDom) -> Result<Self, ExtractionError> {
        Ok(Self::from_posts(id, PostExtractor::new().extract(dom)?))
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn posts(&self) -> &[ForumPost] {
        &self.posts
    }

    /// Post with the given number
    pub fn post(&self, number: u32) -> Option<&ForumPost> {
        self.posts
            .binary_search_by_key(&number, |post| post.number)
            .ok()
            .map(|index| &self.posts[index])
    }

    /// Authors in order of their first post
    pub fn authors(&self) -> Vec<Author<'_>> {
        let mut authors: Vec<Author<'_>> = Vec::new();
        for post in &self.posts {
            match authors.iter_mut().find(|author| author.name == post.author) {
                Some(author) => author.posts.push(post),
                None => authors.push(Author {
                    name: &post.author,
                    posts: vec![post],
                }),
            }
        }
        authors
    }

    /// Posts of the named author, if any
    pub fn author(&self, name: &str) -> Option<Author<'_>> {
        self.authors().into_iter().find(|author| author.name == name)
    }

    /// Authors by post count, most active first; ties ordered by name
    pub fn ranked_authors(&self) -> Vec<Author<'_>> {
        let mut authors = self.authors();
        authors.sort_by(|a, b| {
            b.post_count()
                .cmp(&a.post_count())
                .then_with(|| a.name.cmp(b.name))
        });
        authors
    }
}

/// One author's posts within a thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author<'t> {
    name: &'t str,
    posts: Vec<&'t ForumPost>,
}

impl<'t> Author<'t> {
    pub fn name(&self) -> &'t str {
        self.name
    }

    /// Posts ordered by number
    pub fn posts(&self) -> &[&'t ForumPost] {
        &self.posts
    }

    pub fn post_count(&self) -> usize {
        self.posts.len()
    }

    /// Whether this author wrote the opening post
    pub fn is_op(&self) -> bool {
        self.contains(OPENING_POST)
    }

    pub fn post_numbers(&self) -> Vec<u32> {
        self.posts.iter().map(|post| post.number).collect()
    }

    pub fn contains(&self, number: u32) -> bool {
        self.posts.iter().any(|post| post.number == number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::post::PostTimestamp;

    fn post(number: u32, author: &str) -> ForumPost {
        ForumPost {
            number,
            author: author.to_string(),
            timestamp: PostTimestamp::Unknown { raw: String::new() },
            body_html: format!("post {number}"),
        }
    }

    fn thread() -> Thread {
        Thread::from_posts(
            77,
            vec![
                post(4, "Cy"),
                post(1, "Ann"),
                post(2, "Bob"),
                post(3, "Ann"),
                post(5, "Bob"),
                post(6, "Ann"),
            ],
        )
    }

    #[test]
    fn test_reference_forms() {
        for (input, expected) in [
            ("12345", 12345),
            ("  42\n", 42),
            ("http://www.mspaforums.com/showthread.php?t=44431", 44431),
            ("https://forums.example.com/printthread.php?44431", 44431),
            ("https://example.com/forum/showthread.php?t=9&page=2", 9),
        ] {
            assert_eq!(
                parse_thread_reference(input).expect("valid reference"),
                expected,
                "reference {input:?}"
            );
        }
    }

    #[test]
    fn test_invalid_references() {
        for input in [
            "",
            "abc",
            "-5",
            "ftp://example.com/showthread.php?t=1",
            "https://example.com/member.php?u=1",
            "https://example.com/showthread.php?t=",
            "99999999999999999999999",
        ] {
            assert!(
                matches!(
                    parse_thread_reference(input),
                    Err(ExtractionError::InvalidThreadReference(_))
                ),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_posts_sorted_by_number() {
        let thread = thread();
        let numbers: Vec<_> = thread.posts().iter().map(|p| p.number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(thread.id(), 77);
        assert_eq!(thread.post(4).map(|p| p.author.as_str()), Some("Cy"));
        assert!(thread.post(99).is_none());
    }

    #[test]
    fn test_authors_group_posts() {
        let thread = thread();
        let names: Vec<_> = thread.authors().iter().map(Author::name).collect();
        assert_eq!(names, vec!["Ann", "Bob", "Cy"]);

        let ann = thread.author("Ann").expect("Ann posted");
        assert!(ann.is_op());
        assert_eq!(ann.post_numbers(), vec![1, 3, 6]);
        assert!(ann.contains(3));
        assert!(!ann.contains(2));

        let bob = thread.author("Bob").expect("Bob posted");
        assert!(!bob.is_op());
        assert_eq!(bob.post_count(), 2);
        assert!(thread.author("Dee").is_none());
    }

    #[test]
    fn test_ranked_authors() {
        let thread = Thread::from_posts(
            1,
            vec![post(1, "Zed"), post(2, "Bob"), post(3, "Amy"), post(4, "Bob"), post(5, "Amy")],
        );
        let ranked: Vec<_> = thread
            .ranked_authors()
            .iter()
            .map(|a| (a.name(), a.post_count()))
            .collect();
        assert_eq!(ranked, vec![("Amy", 2), ("Bob", 2), ("Zed", 1)]);
    }

    #[test]
    fn test_empty_thread() {
        let thread = Thread::from_posts(5, Vec::new());
        assert!(thread.authors().is_empty());
        assert!(thread.ranked_authors().is_empty());
    }
}
