//! Time-ordered, prefixed identifiers.
//!
//! Every entity id has the shape `<prefix>_<suffix>` where the suffix is the
//! Crockford base32 encoding of a UUIDv7. The first 48 bits of a UUIDv7 are
//! the creation time in Unix milliseconds, so an id can be dated without a
//! store lookup and ids sort lexicographically by creation time.

use std::fmt;

use thiserror::Error;
use uuid::Uuid;

const ALPHABET: &[u8; 32] = b"0123456789abcdefghjkmnpqrstvwxyz";
const SUFFIX_LEN: usize = 26;
const TIMESTAMP_MASK: u128 = 0xFFFF_FFFF_FFFF;

/// Latest creation time a UUIDv7 can carry.
pub const MAX_TIMESTAMP_MS: u64 = 0xFFFF_FFFF_FFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Prefix {
    User,
    Zap,
    Comment,
    Reaction,
    ReactionImage,
    FriendRequest,
    Friendship,
    Notification,
    Invite,
}

impl Prefix {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Zap => "zap",
            Self::Comment => "comment",
            Self::Reaction => "reaction",
            Self::ReactionImage => "reactionimage",
            Self::FriendRequest => "friendrequest",
            Self::Friendship => "friendship",
            Self::Notification => "notification",
            Self::Invite => "invite",
        }
    }

    fn from_str(s: &str) -> Option<Self> {
        let prefix = match s {
            "user" => Self::User,
            "zap" => Self::Zap,
            "comment" => Self::Comment,
            "reaction" => Self::Reaction,
            "reactionimage" => Self::ReactionImage,
            "friendrequest" => Self::FriendRequest,
            "friendship" => Self::Friendship,
            "notification" => Self::Notification,
            "invite" => Self::Invite,
            _ => return None,
        };
        Some(prefix)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("expected an id with prefix '{expected}', got '{found}'")]
    WrongPrefix { expected: &'static str, found: String },

    #[error("unknown id prefix '{0}'")]
    UnknownPrefix(String),

    #[error("id suffix must be {SUFFIX_LEN} characters, got {0}")]
    BadLength(usize),

    #[error("invalid character '{0}' in id")]
    BadChar(char),

    #[error("id suffix does not fit in 128 bits")]
    Overflow,

    #[error("timestamp {0} does not fit in 48 bits")]
    TimestampRange(u64),
}

/// A parsed identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId {
    prefix: Option<Prefix>,
    uuid: Uuid,
}

impl TypeId {
    /// New id stamped with the current time.
    pub fn generate(prefix: Prefix) -> Self {
        Self {
            prefix: Some(prefix),
            uuid: Uuid::now_v7(),
        }
    }

    /// New id stamped with a caller-supplied creation time.
    ///
    /// Zaps are created with the timestamp the client captured the photos at,
    /// which is what lateness is measured against.
    pub fn at(prefix: Prefix, unix_ms: u64) -> Result<Self, IdError> {
        if unix_ms > MAX_TIMESTAMP_MS {
            return Err(IdError::TimestampRange(unix_ms));
        }
        Ok(Self {
            prefix: Some(prefix),
            uuid: v7_at(unix_ms),
        })
    }

    /// Prefix-less id, used for secrets such as invite codes.
    pub fn untyped() -> Self {
        Self {
            prefix: None,
            uuid: Uuid::now_v7(),
        }
    }

    pub fn parse(s: &str, expected: Option<Prefix>) -> Result<Self, IdError> {
        let (prefix, suffix) = match s.rsplit_once('_') {
            Some((p, suffix)) => {
                let prefix =
                    Prefix::from_str(p).ok_or_else(|| IdError::UnknownPrefix(p.to_string()))?;
                (Some(prefix), suffix)
            }
            None => (None, s),
        };

        if let Some(expected) = expected {
            if prefix != Some(expected) {
                return Err(IdError::WrongPrefix {
                    expected: expected.as_str(),
                    found: prefix.map(Prefix::as_str).unwrap_or_default().to_string(),
                });
            }
        }

        Ok(Self {
            prefix,
            uuid: decode_suffix(suffix)?,
        })
    }

    pub fn prefix(&self) -> Option<Prefix> {
        self.prefix
    }

    /// Creation time in Unix milliseconds.
    pub fn timestamp_ms(&self) -> i64 {
        ((self.uuid.as_u128() >> 80) & TIMESTAMP_MASK) as i64
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(prefix) = self.prefix {
            write!(f, "{}_", prefix.as_str())?;
        }
        f.write_str(&encode_suffix(self.uuid.as_u128()))
    }
}

/// Shorthand for `TypeId::generate(prefix).to_string()`.
pub fn new_id(prefix: Prefix) -> String {
    TypeId::generate(prefix).to_string()
}

fn v7_at(unix_ms: u64) -> Uuid {
    let random: u128 = rand::random();
    let timestamp = (unix_ms as u128) << 80;
    let version = 0x7u128 << 76;
    let rand_a = ((random >> 64) & 0x0FFF) << 64;
    let variant = 0b10u128 << 62;
    let rand_b = random & 0x3FFF_FFFF_FFFF_FFFF;
    Uuid::from_u128(timestamp | version | rand_a | variant | rand_b)
}

fn encode_suffix(value: u128) -> String {
    (0..SUFFIX_LEN)
        .map(|i| {
            let shift = 5 * (SUFFIX_LEN - 1 - i);
            ALPHABET[((value >> shift) & 0x1f) as usize] as char
        })
        .collect()
}

fn decode_suffix(suffix: &str) -> Result<Uuid, IdError> {
    let len = suffix.chars().count();
    if len != SUFFIX_LEN {
        return Err(IdError::BadLength(len));
    }

    let mut value: u128 = 0;
    for (i, c) in suffix.chars().enumerate() {
        let digit = ALPHABET
            .iter()
            .position(|&b| b as char == c)
            .ok_or(IdError::BadChar(c))? as u128;
        // 26 * 5 = 130 bits, so the leading digit may only carry 3
        if i == 0 && digit > 7 {
            return Err(IdError::Overflow);
        }
        value = (value << 5) | digit;
    }

    Ok(Uuid::from_u128(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn generated_id_carries_prefix_and_parses_back() {
        let id = TypeId::generate(Prefix::Zap);
        let text = id.to_string();
        assert!(text.starts_with("zap_"));
        assert_eq!(text.len(), "zap_".len() + SUFFIX_LEN);
        assert_eq!(TypeId::parse(&text, Some(Prefix::Zap)).unwrap(), id);
    }

    #[test]
    fn timestamp_is_recovered_from_id() {
        let ms = 1_717_000_123_456;
        let id = TypeId::at(Prefix::Zap, ms as u64).unwrap().to_string();
        assert_eq!(TypeId::parse(&id, Some(Prefix::Zap)).unwrap().timestamp_ms(), ms);
    }

    #[test]
    fn timestamp_beyond_48_bits_is_rejected() {
        let last = TypeId::at(Prefix::Zap, MAX_TIMESTAMP_MS).unwrap();
        assert_eq!(last.timestamp_ms(), MAX_TIMESTAMP_MS as i64);
        assert_matches!(
            TypeId::at(Prefix::Zap, MAX_TIMESTAMP_MS + 1),
            Err(IdError::TimestampRange(_))
        );
    }

    #[test]
    fn ids_sort_by_creation_time() {
        let earlier = TypeId::at(Prefix::Comment, 1_000_000).unwrap().to_string();
        let later = TypeId::at(Prefix::Comment, 2_000_000).unwrap().to_string();
        assert!(earlier < later);
    }

    #[test]
    fn known_uuid_encodes_to_reference_suffix() {
        // reference vector from the TypeID format
        let uuid = Uuid::parse_str("01890a5d-ac96-774b-bcce-b302099a8057").unwrap();
        assert_eq!(encode_suffix(uuid.as_u128()), "01h455vb4pex5vsknk084sn02q");
        assert_eq!(decode_suffix("01h455vb4pex5vsknk084sn02q").unwrap(), uuid);
    }

    #[test]
    fn wrong_prefix_is_rejected() {
        let id = new_id(Prefix::User);
        assert_matches!(
            TypeId::parse(&id, Some(Prefix::Zap)),
            Err(IdError::WrongPrefix { expected: "zap", .. })
        );
    }

    #[test]
    fn untyped_id_has_no_prefix() {
        let code = TypeId::untyped().to_string();
        assert!(!code.contains('_'));
        assert_eq!(TypeId::parse(&code, None).unwrap().prefix(), None);
    }

    #[test]
    fn malformed_suffixes_are_rejected() {
        assert_matches!(TypeId::parse("zap_short", None), Err(IdError::BadLength(5)));

        let too_big = format!("zap_8{}", "z".repeat(SUFFIX_LEN - 1));
        assert_matches!(TypeId::parse(&too_big, None), Err(IdError::Overflow));

        let bad_char = format!("zap_{}u", "0".repeat(SUFFIX_LEN - 1));
        assert_matches!(TypeId::parse(&bad_char, None), Err(IdError::BadChar('u')));

        assert_matches!(
            TypeId::parse("bogus_01h455vb4pex5vsknk084sn02q", None),
            Err(IdError::UnknownPrefix(_))
        );
    }
}
