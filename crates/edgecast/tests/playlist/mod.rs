use edgecast::{EdgeError, HlsPlaylist, PlaylistEntry};

#[test]
fn parse_live_playlist() -> anyhow::Result<()> {
    let data = include_str!("../fixtures/live.m3u8");
    let playlist = HlsPlaylist::parse(data.as_bytes())?;

    assert_eq!(playlist.target_duration(), 6);
    assert_eq!(playlist.segments().len(), 4);
    assert_eq!(playlist.media_sequence(), 2680);

    let sequences: Vec<_> = playlist.segments().iter().map(|s| s.sequence).collect();
    assert_eq!(sequences, vec![2680, 2681, 2682, 2683]);
    assert_eq!(playlist.segments()[2].uri, "seg_2682.ts");
    assert!((playlist.segments()[2].duration - 6.006).abs() < 1e-4);

    Ok(())
}

#[test]
fn parse_master_playlist_is_rejected() {
    let data = include_str!("../fixtures/master.m3u8");
    let result = HlsPlaylist::parse(data.as_bytes());
    assert!(matches!(result, Err(EdgeError::UnexpectedMasterPlaylist)));
}

#[test]
fn parse_garbage_is_rejected() {
    let result = HlsPlaylist::parse(b"this is not a playlist");
    assert!(matches!(result, Err(EdgeError::M3u8ParseError(_))));
}

#[test]
fn serialized_playlist_parses_back() -> anyhow::Result<()> {
    let mut playlist = HlsPlaylist::new(10);
    for sequence in 7..10 {
        playlist.add_segment(PlaylistEntry {
            uri: format!("/live/seg_{sequence}.ts"),
            sequence,
            duration: 9.5,
        });
    }

    let text = playlist.to_bytes()?;
    let text = std::str::from_utf8(&text)?;
    assert!(text.starts_with("#EXTM3U"));
    assert!(text.contains("#EXT-X-TARGETDURATION:10"));
    assert!(text.contains("#EXT-X-MEDIA-SEQUENCE:7"));
    assert!(text.contains("/live/seg_9.ts"));

    assert_eq!(HlsPlaylist::parse(text.as_bytes())?, playlist);
    Ok(())
}

#[test]
fn out_of_order_entries_are_dropped() {
    let mut playlist = HlsPlaylist::new(6);
    assert!(playlist.add_segment(PlaylistEntry {
        uri: "b.ts".to_string(),
        sequence: 2,
        duration: 6.0,
    }));
    assert!(!playlist.add_segment(PlaylistEntry {
        uri: "a.ts".to_string(),
        sequence: 1,
        duration: 6.0,
    }));
    assert!(!playlist.add_segment(PlaylistEntry {
        uri: "b2.ts".to_string(),
        sequence: 2,
        duration: 6.0,
    }));
    assert_eq!(playlist.segments().len(), 1);
}
