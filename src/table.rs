use crate::projection::{Cell, ProjectedRow, Schema};
use crate::{Result, SpotifyBackupError};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// A uniform stack of projected rows.
///
/// A table starts from one [`Schema`] and can be widened with the columns of another
/// table of the same height, which is how audio-feature columns are appended to track
/// rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<&'static str>,
    schemas: Vec<&'static Schema>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Create an empty table with the columns of `schema`.
    pub fn new(schema: &'static Schema) -> Self {
        Self {
            columns: schema.column_names(),
            schemas: vec![schema],
            rows: Vec::new(),
        }
    }

    /// Build a table from rows of a single schema.
    pub fn from_rows(
        schema: &'static Schema,
        rows: impl IntoIterator<Item = ProjectedRow>,
    ) -> Result<Self> {
        let mut table = Self::new(schema);
        for row in rows {
            table.push(row)?;
        }
        Ok(table)
    }

    /// Append a row. The row must have been projected with this table's schema.
    pub fn push(&mut self, row: ProjectedRow) -> Result<()> {
        if self.schemas.len() != 1 || !std::ptr::eq(self.schemas[0], row.schema()) {
            return Err(SpotifyBackupError::Schema(format!(
                "cannot push a '{}' row into a table of {}",
                row.schema().name,
                self.describe()
            )));
        }
        self.rows.push(row.into_cells());
        Ok(())
    }

    pub fn columns(&self) -> &[&'static str] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All values of the column called `name`, top to bottom.
    pub fn column(&self, name: &str) -> Option<Vec<&Cell>> {
        let index = self.columns.iter().position(|c| *c == name)?;
        Some(self.rows.iter().map(|row| &row[index]).collect())
    }

    /// Drop every row whose `name` column is `Null`; returns how many rows were removed.
    ///
    /// Used to discard rows for unresolvable references before further lookups.
    pub fn retain_non_null(&mut self, name: &str) -> Result<usize> {
        let index = self
            .columns
            .iter()
            .position(|c| *c == name)
            .ok_or_else(|| SpotifyBackupError::Schema(format!("unknown column '{name}'")))?;
        let before = self.rows.len();
        self.rows.retain(|row| !row[index].is_null());
        Ok(before - self.rows.len())
    }

    /// Append the columns of `other` to the right of this table, row by row.
    pub fn hconcat(mut self, other: Table) -> Result<Self> {
        if self.rows.len() != other.rows.len() {
            return Err(SpotifyBackupError::Schema(format!(
                "cannot join {} rows of {} with {} rows of {}",
                self.rows.len(),
                self.describe(),
                other.rows.len(),
                other.describe()
            )));
        }
        self.columns.extend(other.columns);
        self.schemas.extend(other.schemas);
        for (row, extra) in self.rows.iter_mut().zip(other.rows) {
            row.extend(extra);
        }
        Ok(self)
    }

    /// Write the table as CSV with a header row. `Null` cells are empty fields.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(&self.columns)?;
        for row in &self.rows {
            csv_writer.write_record(row.iter().map(|cell| cell.to_string()))?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    /// Write the table as CSV to `path`, replacing any existing file.
    pub fn save_csv(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        self.write_csv(file)?;
        log::debug!("Wrote {} rows to {}", self.rows.len(), path.display());
        Ok(())
    }

    fn describe(&self) -> String {
        let names: Vec<&str> = self.schemas.iter().map(|s| s.name).collect();
        format!("'{}'", names.join("+"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::{
        project_features, project_playlist, project_track, AUDIO_FEATURES_SCHEMA,
        PLAYLIST_SCHEMA, TRACK_SCHEMA,
    };
    use serde_json::json;

    fn item(name: &str, uri: &str) -> serde_json::Value {
        json!({
            "added_at": "2022-02-02T00:00:00Z",
            "track": {"name": name, "uri": uri, "artists": [{"name": "Someone"}]}
        })
    }

    #[test]
    fn test_retain_non_null_drops_unresolved_rows() {
        let mut table = Table::from_rows(
            &TRACK_SCHEMA,
            vec![
                project_track(Some(&item("One", "spotify:track:1"))),
                project_track(None),
                project_track(Some(&item("Three", "spotify:track:3"))),
            ],
        )
        .unwrap();
        assert_eq!(table.len(), 3);

        let removed = table.retain_non_null("uri").unwrap();
        assert_eq!(removed, 1);
        let names: Vec<String> = table
            .column("name")
            .unwrap()
            .iter()
            .map(|c| c.to_string())
            .collect();
        assert_eq!(names, vec!["One", "Three"]);
    }

    #[test]
    fn test_retain_on_unknown_column_fails() {
        let mut table = Table::new(&PLAYLIST_SCHEMA);
        assert!(matches!(
            table.retain_non_null("popularity"),
            Err(SpotifyBackupError::Schema(_))
        ));
    }

    #[test]
    fn test_push_rejects_foreign_schema() {
        let mut table = Table::new(&TRACK_SCHEMA);
        assert!(matches!(
            table.push(project_playlist(None)),
            Err(SpotifyBackupError::Schema(_))
        ));
    }

    #[test]
    fn test_hconcat_appends_feature_columns() {
        let tracks =
            Table::from_rows(&TRACK_SCHEMA, vec![project_track(Some(&item("One", "spotify:track:1")))])
                .unwrap();
        let features = Table::from_rows(
            &AUDIO_FEATURES_SCHEMA,
            vec![project_features(Some(&json!({"tempo": 120.0, "key": 5})))],
        )
        .unwrap();

        let joined = tracks.hconcat(features).unwrap();
        assert_eq!(
            joined.columns().len(),
            TRACK_SCHEMA.len() + AUDIO_FEATURES_SCHEMA.len()
        );
        assert_eq!(joined.columns()[TRACK_SCHEMA.len()], "tempo");
        assert_eq!(joined.column("key").unwrap(), vec![&Cell::Integer(5)]);
    }

    #[test]
    fn test_hconcat_requires_equal_heights() {
        let tracks = Table::from_rows(&TRACK_SCHEMA, vec![project_track(None)]).unwrap();
        let features = Table::new(&AUDIO_FEATURES_SCHEMA);
        assert!(matches!(tracks.hconcat(features), Err(SpotifyBackupError::Schema(_))));
    }

    #[test]
    fn test_write_csv() {
        let table = Table::from_rows(
            &PLAYLIST_SCHEMA,
            vec![
                project_playlist(Some(&json!({
                    "name": "Mix, vol. 1",
                    "description": "say \"hi\"",
                    "uri": "spotify:playlist:abc",
                    "external_urls": {"spotify": "https://open.spotify.com/playlist/abc"},
                    "owner": {"display_name": "me", "uri": "spotify:user:me"}
                }))),
                project_playlist(None),
            ],
        )
        .unwrap();

        let mut out = Vec::new();
        table.write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "name,description,uri,url,owner_name,owner_uri");
        assert_eq!(
            lines[1],
            r#""Mix, vol. 1","say ""hi""",spotify:playlist:abc,https://open.spotify.com/playlist/abc,me,spotify:user:me"#
        );
        assert_eq!(lines[2], ",,,,,");
    }
}
