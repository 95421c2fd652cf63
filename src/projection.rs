//! Flattening of raw Spotify records into fixed-column rows.
//!
//! Every entity type has a declared [`Schema`]: an ordered list of columns, each
//! extracted from the raw JSON by a fixed path. Projection never fails. A missing key
//! anywhere along a path, or a value of the wrong shape, becomes [`Cell::Null`], and
//! an absent record becomes a row of nulls, so rows of one schema always stack into a
//! uniform table.

use serde::Serialize;
use serde_json::Value;
use std::fmt;

// ================================================================================================
// CELLS
// ================================================================================================

/// A scalar value of one projected column.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Cell {
    /// Convert a JSON leaf into a cell. Arrays and objects are not scalars and map to `Null`.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Cell::Null,
            Value::Bool(b) => Cell::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Cell::Integer(i),
                None => n.as_f64().map(Cell::Float).unwrap_or(Cell::Null),
            },
            Value::String(s) => Cell::Text(s.clone()),
            Value::Array(_) | Value::Object(_) => Cell::Null,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Renders the value the way it appears in a CSV field; `Null` is empty.
impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => Ok(()),
            Cell::Bool(b) => write!(f, "{b}"),
            Cell::Integer(i) => write!(f, "{i}"),
            Cell::Float(x) if x.is_finite() && x.fract() == 0.0 => write!(f, "{x:.1}"),
            Cell::Float(x) => write!(f, "{x}"),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

// ================================================================================================
// SCHEMAS
// ================================================================================================

/// How a column's value is located inside a raw record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// Follow object keys and take the scalar found at the end.
    Path(&'static [&'static str]),
    /// Follow object keys to an array of artist objects and render their names.
    ///
    /// The names are written as a JSON array string, e.g. `["Daft Punk","Pharrell Williams"]`,
    /// which keeps a single artist (`["Adele"]`) distinguishable from a joined list.
    ArtistNames(&'static [&'static str]),
}

impl Field {
    /// Extract this field from `record`, substituting `Null` for any shape mismatch.
    pub fn extract(&self, record: &Value) -> Cell {
        match self {
            Field::Path(path) => lookup(record, path).map_or(Cell::Null, Cell::from_json),
            Field::ArtistNames(path) => {
                let Some(artists) = lookup(record, path).and_then(Value::as_array) else {
                    return Cell::Null;
                };
                let names: Vec<Value> = artists
                    .iter()
                    .map(|artist| match artist.get("name") {
                        Some(Value::String(name)) => Value::String(name.clone()),
                        _ => Value::Null,
                    })
                    .collect();
                serde_json::to_string(&names).map_or(Cell::Null, Cell::Text)
            }
        }
    }
}

fn lookup<'v>(record: &'v Value, path: &[&str]) -> Option<&'v Value> {
    path.iter().try_fold(record, |value, key| value.get(*key))
}

/// One declared output column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub field: Field,
}

/// A named, ordered column set for one entity type.
///
/// Schemas are declared once as statics and passed by reference to the projector and
/// to [`Table`](crate::Table); the column order is the order written to disk.
#[derive(Debug, PartialEq, Eq)]
pub struct Schema {
    /// Name of the entity type, used in log and error messages
    pub name: &'static str,
    /// Key of the record that must be present and non-null for the record to count
    /// as present at all
    pub required: Option<&'static str>,
    /// Declared columns, in output order
    pub columns: &'static [Column],
}

impl Schema {
    /// Column names in declared order.
    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    /// Position of `name` in the declared order.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// A row with every declared column set to `Null`.
    pub fn null_row(&'static self) -> ProjectedRow {
        ProjectedRow {
            schema: self,
            cells: vec![Cell::Null; self.columns.len()],
        }
    }
}

/// Playlist metadata, one row per playlist.
#[rustfmt::skip]
pub static PLAYLIST_SCHEMA: Schema = Schema {
    name: "playlist",
    required: None,
    columns: &[
        Column { name: "name", field: Field::Path(&["name"]) },
        Column { name: "description", field: Field::Path(&["description"]) },
        Column { name: "uri", field: Field::Path(&["uri"]) },
        Column { name: "url", field: Field::Path(&["external_urls", "spotify"]) },
        Column { name: "owner_name", field: Field::Path(&["owner", "display_name"]) },
        Column { name: "owner_uri", field: Field::Path(&["owner", "uri"]) },
    ],
};

/// Basic track metadata, projected from a playlist item (`{added_at, track}`).
///
/// An item whose `track` is null (a deleted or unavailable track) projects to an
/// all-null row.
#[rustfmt::skip]
pub static TRACK_SCHEMA: Schema = Schema {
    name: "track",
    required: Some("track"),
    columns: &[
        Column { name: "added_at", field: Field::Path(&["added_at"]) },
        Column { name: "uri", field: Field::Path(&["track", "uri"]) },
        Column { name: "url", field: Field::Path(&["track", "external_urls", "spotify"]) },
        Column { name: "name", field: Field::Path(&["track", "name"]) },
        Column { name: "artist", field: Field::ArtistNames(&["track", "artists"]) },
        Column { name: "album", field: Field::Path(&["track", "album", "name"]) },
        Column { name: "album_date", field: Field::Path(&["track", "album", "release_date"]) },
        // milliseconds
        Column { name: "duration", field: Field::Path(&["track", "duration_ms"]) },
        // 0-100
        Column { name: "popularity", field: Field::Path(&["track", "popularity"]) },
    ],
};

/// Audio features of a track, passed through verbatim.
#[rustfmt::skip]
pub static AUDIO_FEATURES_SCHEMA: Schema = Schema {
    name: "audio_features",
    required: None,
    columns: &[
        Column { name: "tempo", field: Field::Path(&["tempo"]) },
        Column { name: "time_signature", field: Field::Path(&["time_signature"]) },
        // -1 when no key was detected
        Column { name: "key", field: Field::Path(&["key"]) },
        Column { name: "mode", field: Field::Path(&["mode"]) },
        Column { name: "danceability", field: Field::Path(&["danceability"]) },
        Column { name: "energy", field: Field::Path(&["energy"]) },
        Column { name: "speechiness", field: Field::Path(&["speechiness"]) },
        Column { name: "acousticness", field: Field::Path(&["acousticness"]) },
        Column { name: "instrumentalness", field: Field::Path(&["instrumentalness"]) },
        Column { name: "liveness", field: Field::Path(&["liveness"]) },
        // dB
        Column { name: "loudness", field: Field::Path(&["loudness"]) },
        Column { name: "valence", field: Field::Path(&["valence"]) },
    ],
};

// ================================================================================================
// ROWS
// ================================================================================================

/// A flat row whose cells line up with the columns of its schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedRow {
    schema: &'static Schema,
    cells: Vec<Cell>,
}

impl ProjectedRow {
    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn into_cells(self) -> Vec<Cell> {
        self.cells
    }

    /// Value of the column called `name`, if the schema declares it.
    pub fn get(&self, name: &str) -> Option<&Cell> {
        self.schema.index_of(name).map(|i| &self.cells[i])
    }

    /// Whether every cell is `Null`.
    pub fn is_null(&self) -> bool {
        self.cells.iter().all(Cell::is_null)
    }

    /// Column name / value pairs in declared order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Cell)> + '_ {
        self.schema.columns.iter().map(|c| c.name).zip(&self.cells)
    }
}

/// Project a raw record onto `schema`.
///
/// `None`, JSON `null`, and records lacking the schema's required key all yield a row
/// of nulls. Otherwise each column is extracted independently.
///
/// # Examples
///
/// ```rust
/// use serde_json::json;
/// use spotify_backup::{project, Cell, PLAYLIST_SCHEMA};
///
/// let raw = json!({"name": "Road trip", "uri": "spotify:playlist:abc", "owner": {}});
/// let row = project(Some(&raw), &PLAYLIST_SCHEMA);
///
/// assert_eq!(row.get("name"), Some(&Cell::Text("Road trip".to_string())));
/// assert_eq!(row.get("owner_name"), Some(&Cell::Null));
/// assert!(project(None, &PLAYLIST_SCHEMA).is_null());
/// ```
pub fn project(raw: Option<&Value>, schema: &'static Schema) -> ProjectedRow {
    let record = raw.filter(|record| is_present(record, schema));
    let Some(record) = record else {
        return schema.null_row();
    };

    ProjectedRow {
        schema,
        cells: schema
            .columns
            .iter()
            .map(|column| column.field.extract(record))
            .collect(),
    }
}

fn is_present(record: &Value, schema: &Schema) -> bool {
    if record.is_null() {
        return false;
    }
    match schema.required {
        Some(key) => record.get(key).is_some_and(|v| !v.is_null()),
        None => true,
    }
}

/// Project a playlist object onto [`PLAYLIST_SCHEMA`].
pub fn project_playlist(raw: Option<&Value>) -> ProjectedRow {
    project(raw, &PLAYLIST_SCHEMA)
}

/// Project a playlist item onto [`TRACK_SCHEMA`].
pub fn project_track(raw: Option<&Value>) -> ProjectedRow {
    project(raw, &TRACK_SCHEMA)
}

/// Project an audio-features object onto [`AUDIO_FEATURES_SCHEMA`].
pub fn project_features(raw: Option<&Value>) -> ProjectedRow {
    project(raw, &AUDIO_FEATURES_SCHEMA)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn playlist_item() -> Value {
        json!({
            "added_at": "2021-06-01T10:00:00Z",
            "added_by": {"id": "someone"},
            "is_local": false,
            "track": {
                "name": "Get Lucky",
                "uri": "spotify:track:69kOkLUCkxIZYexIgSG8rq",
                "external_urls": {"spotify": "https://open.spotify.com/track/69kOkLUCkxIZYexIgSG8rq"},
                "artists": [{"name": "Daft Punk"}, {"name": "Pharrell Williams"}],
                "album": {"name": "Random Access Memories", "release_date": "2013-05-17"},
                "duration_ms": 369626,
                "popularity": 81
            }
        })
    }

    #[test]
    fn test_full_track_projection() {
        let row = project_track(Some(&playlist_item()));
        let cells: Vec<(&str, String)> = row.iter().map(|(k, v)| (k, v.to_string())).collect();
        assert_eq!(
            cells,
            vec![
                ("added_at", "2021-06-01T10:00:00Z".to_string()),
                ("uri", "spotify:track:69kOkLUCkxIZYexIgSG8rq".to_string()),
                ("url", "https://open.spotify.com/track/69kOkLUCkxIZYexIgSG8rq".to_string()),
                ("name", "Get Lucky".to_string()),
                ("artist", r#"["Daft Punk","Pharrell Williams"]"#.to_string()),
                ("album", "Random Access Memories".to_string()),
                ("album_date", "2013-05-17".to_string()),
                ("duration", "369626".to_string()),
                ("popularity", "81".to_string()),
            ]
        );
    }

    #[test]
    fn test_missing_release_date_only_nulls_that_column() {
        let full = project_track(Some(&playlist_item()));

        let mut raw = playlist_item();
        raw["track"]["album"]
            .as_object_mut()
            .unwrap()
            .remove("release_date");
        let partial = project_track(Some(&raw));

        let date = TRACK_SCHEMA.index_of("album_date").unwrap();
        for (i, (a, b)) in full.cells().iter().zip(partial.cells()).enumerate() {
            if i == date {
                assert!(b.is_null());
            } else {
                assert_eq!(a, b);
            }
        }
    }

    #[test]
    fn test_null_record_projects_to_null_row_for_every_schema() {
        for schema in [&PLAYLIST_SCHEMA, &TRACK_SCHEMA, &AUDIO_FEATURES_SCHEMA] {
            let row = project(None, schema);
            assert_eq!(row.cells().len(), schema.len());
            assert!(row.is_null());

            let row = project(Some(&Value::Null), schema);
            assert!(row.is_null());
        }
    }

    #[test]
    fn test_deleted_track_item_is_a_null_record() {
        let item = json!({"added_at": "2020-01-01T00:00:00Z", "track": null});
        assert!(project_track(Some(&item)).is_null());
    }

    #[test]
    fn test_single_artist_is_distinguishable() {
        let mut raw = playlist_item();
        raw["track"]["artists"] = json!([{"name": "Daft Punk, Pharrell Williams"}]);
        let row = project_track(Some(&raw));
        assert_eq!(
            row.get("artist").and_then(Cell::as_str),
            Some(r#"["Daft Punk, Pharrell Williams"]"#)
        );
    }

    #[test]
    fn test_playlist_with_missing_external_urls() {
        let raw = json!({
            "name": "Focus",
            "description": "",
            "uri": "spotify:playlist:37i9dQZF1DX0XUsuxWHRQd",
            "owner": {"display_name": "Spotify", "uri": "spotify:user:spotify"}
        });
        let row = project_playlist(Some(&raw));
        assert_eq!(row.get("url"), Some(&Cell::Null));
        assert_eq!(row.get("owner_name"), Some(&Cell::Text("Spotify".to_string())));
        assert_eq!(row.get("description"), Some(&Cell::Text(String::new())));
    }

    #[test]
    fn test_wrong_shapes_become_null() {
        let raw = json!({
            "name": ["not", "a", "scalar"],
            "owner": "just a string",
            "uri": "spotify:playlist:x"
        });
        let row = project_playlist(Some(&raw));
        assert_eq!(row.get("name"), Some(&Cell::Null));
        assert_eq!(row.get("owner_name"), Some(&Cell::Null));
        assert_eq!(row.get("uri").and_then(Cell::as_str), Some("spotify:playlist:x"));
    }

    #[test]
    fn test_audio_features_pass_through() {
        let raw = json!({
            "tempo": 116.047, "time_signature": 4, "key": -1, "mode": 0,
            "danceability": 0.794, "energy": 0.811, "speechiness": 0.038,
            "acousticness": 0.0426, "instrumentalness": 1.07e-6, "liveness": 0.101,
            "loudness": -8.966, "valence": 0.862, "type": "audio_features"
        });
        let row = project_features(Some(&raw));
        assert_eq!(row.get("tempo"), Some(&Cell::Float(116.047)));
        assert_eq!(row.get("key"), Some(&Cell::Integer(-1)));
        assert_eq!(row.get("loudness"), Some(&Cell::Float(-8.966)));
        assert_eq!(row.cells().len(), 12);
        assert!(row.get("type").is_none());
    }

    #[test]
    fn test_cell_display() {
        assert_eq!(Cell::Null.to_string(), "");
        assert_eq!(Cell::Integer(81).to_string(), "81");
        assert_eq!(Cell::Float(-5.5).to_string(), "-5.5");
        assert_eq!(Cell::Float(120.0).to_string(), "120.0");
        assert_eq!(Cell::Float(0.5).to_string(), "0.5");
        assert_eq!(Cell::Bool(true).to_string(), "true");
    }
}
