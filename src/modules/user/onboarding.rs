use super::repository;
use regex::Regex;
use sqlx::PgPool;
use std::borrow::Cow;
use std::sync::OnceLock;
use validator::ValidationError;

const MAX_SUFFIX: u32 = 99;

fn nickname_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"^[\p{L}0-9_]+$").expect("Invalid nickname regex"))
}

pub fn validate_nickname(nickname: &str) -> Result<(), ValidationError> {
    let length = nickname.chars().count();
    if length < 2 || length > 20 {
        return Err(ValidationError::new("INVALID_NICKNAME_LENGTH")
            .with_message(Cow::from("Nickname must be between 2 and 20 characters")));
    }

    match nickname_regex().is_match(nickname) {
        true => Ok(()),
        false => Err(ValidationError::new("INVALID_NICKNAME_CHARSET").with_message(Cow::from(
            "Nickname may only contain letters, digits and underscores",
        ))),
    }
}

/// Candidate sequence for a given email local-part: the local-part itself,
/// then `local1`, `local2`, ... up to `local99`.
pub fn candidates(local_part: &str) -> impl Iterator<Item = String> + '_ {
    std::iter::once(local_part.to_string())
        .chain((1..=MAX_SUFFIX).map(move |n| format!("{}{}", local_part, n)))
}

pub fn local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

pub enum Error {
    UnexpectedError,
}

/// Suggests a unique nickname for a first sign-in, derived from the email
/// local-part. Returns None when every suffixed form is taken; the client
/// then has to collect a nickname manually. The suggestion is not reserved,
/// so the eventual write may still lose a race and come back as a conflict.
pub async fn resolve_initial_nickname(
    db: &PgPool,
    email: String,
) -> Result<Option<String>, Error> {
    for candidate in candidates(local_part(email.as_str())) {
        let taken = repository::is_nickname_taken(db, candidate.clone())
            .await
            .map_err(|_| Error::UnexpectedError)?;

        if !taken {
            return Ok(Some(candidate));
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn first_free(local: &str, taken: &HashSet<&str>) -> Option<String> {
        candidates(local).find(|c| !taken.contains(c.as_str()))
    }

    #[test]
    fn unique_local_part_is_returned_unchanged() {
        let taken = HashSet::new();
        assert_eq!(first_free("a", &taken), Some("a".to_string()));
    }

    #[test]
    fn collision_appends_smallest_free_suffix() {
        let taken = HashSet::from(["a"]);
        assert_eq!(first_free("a", &taken), Some("a1".to_string()));

        let taken = HashSet::from(["mina", "mina1", "mina2"]);
        assert_eq!(first_free("mina", &taken), Some("mina3".to_string()));
    }

    #[test]
    fn gap_in_suffixes_is_picked() {
        let taken = HashSet::from(["a", "a1", "a3"]);
        assert_eq!(first_free("a", &taken), Some("a2".to_string()));
    }

    #[test]
    fn gives_up_after_ninety_nine_suffixes() {
        let owned: Vec<String> = candidates("a").collect();
        assert_eq!(owned.len(), 100);
        let taken: HashSet<&str> = owned.iter().map(|s| s.as_str()).collect();
        assert_eq!(first_free("a", &taken), None);
    }

    #[test]
    fn local_part_stops_at_first_at_sign() {
        assert_eq!(local_part("kim@example.com"), "kim");
        assert_eq!(local_part("a@b@c"), "a");
        assert_eq!(local_part("no-at-sign"), "no-at-sign");
    }

    #[test]
    fn nickname_length_bounds() {
        assert!(validate_nickname("a").is_err());
        assert!(validate_nickname("ab").is_ok());
        assert!(validate_nickname(&"a".repeat(20)).is_ok());
        assert!(validate_nickname(&"a".repeat(21)).is_err());
    }

    #[test]
    fn nickname_charset_allows_hangul_digits_underscore() {
        assert!(validate_nickname("맛집탐험가").is_ok());
        assert!(validate_nickname("kim_123").is_ok());
        assert!(validate_nickname("kim 123").is_err());
        assert!(validate_nickname("kim@123").is_err());
        assert!(validate_nickname("kim-123").is_err());
    }

    #[test]
    fn hangul_counts_characters_not_bytes() {
        // 10 Hangul syllables are 30 bytes but must pass the 20-char cap.
        assert!(validate_nickname(&"김".repeat(10)).is_ok());
        assert!(validate_nickname(&"김".repeat(21)).is_err());
    }
}
