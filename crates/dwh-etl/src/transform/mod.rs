//! In-process evaluation of the transformation rules.
//!
//! Used to try the rules against local samples of the event log and song
//! metadata before running the warehouse load.

mod records;
mod rules;

pub use records::{read_records, StagingEvent, StagingSong};
pub use rules::{
    derive_artists, derive_songplays, derive_songs, derive_time, derive_users, is_song_play,
    matches_song, ArtistRow, SongRow, SongplayRow, TimeParts, UserRow, DURATION_TOLERANCE_SECS,
    SONG_PLAY_PAGE,
};

use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::config::UserConflictPolicy;
use crate::error::Result;

/// Row counts derived from local samples.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewSummary {
    pub events: usize,
    pub song_plays: usize,
    pub staged_songs: usize,
    pub songplays: usize,
    pub users: usize,
    pub songs: usize,
    pub artists: usize,
    pub time: usize,
}

impl PreviewSummary {
    /// Evaluate every table's rules over in-memory records.
    pub fn evaluate(
        events: &[StagingEvent],
        songs: &[StagingSong],
        policy: UserConflictPolicy,
    ) -> Self {
        Self {
            events: events.len(),
            song_plays: events.iter().filter(|e| is_song_play(e)).count(),
            staged_songs: songs.len(),
            songplays: derive_songplays(events, songs).len(),
            users: derive_users(events, policy).len(),
            songs: derive_songs(songs).len(),
            artists: derive_artists(songs).len(),
            time: derive_time(events).len(),
        }
    }
}

/// Read local event and song files and evaluate the rules over them.
pub fn preview(
    events_path: &Path,
    songs_path: &Path,
    policy: UserConflictPolicy,
) -> Result<PreviewSummary> {
    let events: Vec<StagingEvent> = read_records(events_path)?;
    let songs: Vec<StagingSong> = read_records(songs_path)?;
    info!(
        "Loaded {} events and {} songs",
        events.len(),
        songs.len()
    );
    Ok(PreviewSummary::evaluate(&events, &songs, policy))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_preview_counts() {
        let dir = TempDir::new().unwrap();
        let events_path = dir.path().join("events.json");
        let songs_path = dir.path().join("songs.json");

        fs::write(
            &events_path,
            concat!(
                r#"{"artist":"Muse","song":"Supermassive Black Hole","length":209.5,"page":"NextSong","ts":1541990258796,"userId":"73","firstName":"Jacob","lastName":"Klein","gender":"M","level":"paid","sessionId":954}"#,
                "\n",
                r#"{"artist":null,"song":null,"length":null,"page":"Home","ts":1541990300000,"userId":""}"#,
                "\n",
                r#"{"artist":"Muse","song":"Uprising","length":303.0,"page":"NextSong","ts":1541990600000,"userId":"73","firstName":"Jacob","lastName":"Klein","gender":"M","level":"paid","sessionId":954}"#,
                "\n",
            ),
        )
        .unwrap();
        fs::write(
            &songs_path,
            r#"{"num_songs":1,"artist_id":"AR1","artist_name":"Muse","song_id":"SO1","title":"Supermassive Black Hole","duration":210.2,"year":2006}"#,
        )
        .unwrap();

        let summary = preview(&events_path, &songs_path, UserConflictPolicy::AllDistinct).unwrap();
        assert_eq!(
            summary,
            PreviewSummary {
                events: 3,
                song_plays: 2,
                staged_songs: 1,
                songplays: 1,
                users: 1,
                songs: 1,
                artists: 1,
                time: 2,
            }
        );
    }
}
