use bytes::Bytes;
use m3u8_rs::{MediaPlaylist, MediaSegment, Playlist};

use crate::error::{EdgeError, EdgeResult};

#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistEntry {
    pub uri: String,
    /// Media sequence number, `EXT-X-MEDIA-SEQUENCE` plus the entry index
    pub sequence: u64,
    /// `EXTINF` duration in seconds
    pub duration: f32,
}

/// An HLS media playlist reduced to what the reconciler needs.
///
/// Entries are kept in ascending sequence order without duplicates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HlsPlaylist {
    target_duration: u64,
    segments: Vec<PlaylistEntry>,
}

impl HlsPlaylist {
    pub fn new(target_duration: u64) -> Self {
        Self {
            target_duration,
            segments: Vec::new(),
        }
    }

    pub fn parse(content: &[u8]) -> EdgeResult<Self> {
        let playlist = match m3u8_rs::parse_playlist_res(content) {
            Ok(Playlist::MediaPlaylist(playlist)) => playlist,
            Ok(Playlist::MasterPlaylist(_)) => return Err(EdgeError::UnexpectedMasterPlaylist),
            Err(e) => return Err(EdgeError::M3u8ParseError(e.to_string())),
        };

        let mut parsed = Self::new(playlist.target_duration);
        for (i, segment) in playlist.segments.into_iter().enumerate() {
            parsed.add_segment(PlaylistEntry {
                uri: segment.uri,
                sequence: playlist.media_sequence + i as u64,
                duration: segment.duration,
            });
        }
        Ok(parsed)
    }

    pub fn target_duration(&self) -> u64 {
        self.target_duration
    }

    pub fn segments(&self) -> &[PlaylistEntry] {
        &self.segments
    }

    /// Appends an entry. Entries not newer than the current last one are dropped.
    pub fn add_segment(&mut self, entry: PlaylistEntry) -> bool {
        if let Some(last) = self.segments.last() {
            if entry.sequence <= last.sequence {
                tracing::warn!(
                    "Dropping out of order playlist entry {} (seq {} after {})",
                    entry.uri,
                    entry.sequence,
                    last.sequence
                );
                return false;
            }
        }
        self.segments.push(entry);
        true
    }

    pub fn media_sequence(&self) -> u64 {
        self.segments.first().map(|s| s.sequence).unwrap_or(0)
    }

    fn to_media_playlist(&self) -> MediaPlaylist {
        MediaPlaylist {
            version: Some(3),
            target_duration: self.target_duration,
            media_sequence: self.media_sequence(),
            segments: self
                .segments
                .iter()
                .map(|entry| MediaSegment {
                    uri: entry.uri.clone(),
                    duration: entry.duration,
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }

    pub fn to_bytes(&self) -> EdgeResult<Bytes> {
        let mut output = Vec::new();
        self.to_media_playlist().write_to(&mut output)?;
        Ok(Bytes::from(output))
    }
}
