use crate::{Result, SpotifyBackupError};
use serde_json::Value;
use std::fmt;

/// URI namespace used by every Spotify resource.
pub const NAMESPACE: &str = "spotify";

const SHARE_LINK_PREFIX: &str = "https://open.spotify.com/";

/// Kinds of Spotify entities this crate refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityType {
    User,
    Playlist,
    Track,
}

impl EntityType {
    /// The `<entityType>` segment used in URIs and share links.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::User => "user",
            EntityType::Playlist => "playlist",
            EntityType::Track => "track",
        }
    }

    /// The canonical `spotify:<type>:` prefix.
    pub fn uri_prefix(&self) -> String {
        format!("{NAMESPACE}:{}:", self.as_str())
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reference to a user, playlist or track.
///
/// Callers may hold an entity in any of three equivalent forms. The variant is decided
/// once, when the value enters the crate, and resolved with [`to_uri`](Self::to_uri) or
/// [`to_id`](Self::to_id) right before a remote call.
///
/// # Examples
///
/// ```rust
/// use spotify_backup::{EntityType, Identifier};
///
/// let bare = Identifier::parse("4uLU6hMCjMI75M1A2tKUQC");
/// assert_eq!(
///     bare.to_uri(EntityType::Track).unwrap(),
///     "spotify:track:4uLU6hMCjMI75M1A2tKUQC"
/// );
///
/// let link = Identifier::parse("https://open.spotify.com/playlist/37i9dQZF1DXcBWIGoYBM5M?si=abc");
/// assert_eq!(link.to_id(EntityType::Playlist).unwrap(), "37i9dQZF1DXcBWIGoYBM5M");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Identifier {
    /// A bare base-62 ID such as `4uLU6hMCjMI75M1A2tKUQC`
    Id(String),
    /// A fully-qualified URI such as `spotify:track:4uLU6hMCjMI75M1A2tKUQC`
    Uri(String),
    /// A raw record as returned by the Web API
    Record(Value),
}

impl Identifier {
    /// Classify a user-supplied string.
    ///
    /// Strings containing `:` are URIs. `open.spotify.com` share links are rewritten
    /// into URIs; query strings and trailing slashes are dropped. Everything else is a
    /// bare ID. No validation happens here; malformed values are reported when they
    /// are resolved.
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if let Some(path) = value.strip_prefix(SHARE_LINK_PREFIX) {
            let path = path.split(|c| c == '?' || c == '#').next().unwrap_or_default();
            let mut segments = path.trim_end_matches('/').splitn(2, '/');
            if let (Some(kind), Some(id)) = (segments.next(), segments.next()) {
                return Identifier::Uri(format!("{NAMESPACE}:{kind}:{id}"));
            }
            return Identifier::Id(value.to_string());
        }
        if value.contains(':') {
            Identifier::Uri(value.to_string())
        } else {
            Identifier::Id(value.to_string())
        }
    }

    /// Resolve to the canonical `spotify:<type>:<id>` form.
    ///
    /// Records yield their `uri` field; URIs already carrying the expected prefix are
    /// returned unchanged; bare IDs get the prefix prepended. The operation is
    /// idempotent.
    pub fn to_uri(&self, entity: EntityType) -> Result<String> {
        match self {
            Identifier::Record(record) => {
                let uri = record.get("uri").and_then(Value::as_str).ok_or_else(|| {
                    SpotifyBackupError::MalformedIdentifier(format!(
                        "{entity} record has no uri field"
                    ))
                })?;
                Identifier::Uri(uri.to_string()).to_uri(entity)
            }
            Identifier::Uri(uri) => {
                let id = strip_prefix(uri, entity)?;
                validate_id(id)?;
                Ok(uri.clone())
            }
            Identifier::Id(id) => {
                validate_id(id)?;
                Ok(format!("{}{id}", entity.uri_prefix()))
            }
        }
    }

    /// Resolve to the bare ID.
    ///
    /// Records yield their `id` field, falling back to the ID segment of their `uri`.
    pub fn to_id(&self, entity: EntityType) -> Result<String> {
        match self {
            Identifier::Record(record) => match record.get("id").and_then(Value::as_str) {
                Some(id) => {
                    validate_id(id)?;
                    Ok(id.to_string())
                }
                None => {
                    let uri = self.to_uri(entity)?;
                    Ok(strip_prefix(&uri, entity)?.to_string())
                }
            },
            Identifier::Uri(uri) => {
                let id = strip_prefix(uri, entity)?;
                validate_id(id)?;
                Ok(id.to_string())
            }
            Identifier::Id(id) => {
                validate_id(id)?;
                Ok(id.clone())
            }
        }
    }

    /// The wrapped record, if this identifier already carries one.
    pub fn as_record(&self) -> Option<&Value> {
        match self {
            Identifier::Record(record) => Some(record),
            _ => None,
        }
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Identifier::parse(value)
    }
}

impl From<String> for Identifier {
    fn from(value: String) -> Self {
        Identifier::parse(&value)
    }
}

impl From<Value> for Identifier {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => Identifier::parse(&s),
            other => Identifier::Record(other),
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Id(id) => f.write_str(id),
            Identifier::Uri(uri) => f.write_str(uri),
            Identifier::Record(record) => match record.get("uri").and_then(Value::as_str) {
                Some(uri) => f.write_str(uri),
                None => f.write_str("<record>"),
            },
        }
    }
}

fn strip_prefix(uri: &str, entity: EntityType) -> Result<&str> {
    uri.strip_prefix(&entity.uri_prefix()).ok_or_else(|| {
        SpotifyBackupError::MalformedIdentifier(format!("'{uri}' is not a {entity} URI"))
    })
}

fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(SpotifyBackupError::MalformedIdentifier(
            "empty identifier".to_string(),
        ));
    }
    if id.contains(|c: char| c == ':' || c == '/' || c.is_whitespace()) {
        return Err(SpotifyBackupError::MalformedIdentifier(format!(
            "'{id}' is not a valid ID"
        )));
    }
    Ok(())
}
