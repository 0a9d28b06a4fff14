use std::sync::Arc;

use edgecast::{HlsPlaylist, ItemSource};

use crate::{broadcast_stream, cache, media_playlist};

#[test]
fn broadcast_then_cdn_merge() -> anyhow::Result<()> {
    let cache = cache();
    let stream = broadcast_stream(cache.clone(), 3, 1);

    stream.merge(media_playlist(1, 4, 6).as_bytes(), ItemSource::Broadcast)?;
    assert_eq!(stream.window(), vec![2, 3, 4]);
    assert!(!cache.contains("live/seg_1.ts"));

    let synthesized = HlsPlaylist::parse(&stream.playlist())?;
    let listed: Vec<_> = synthesized
        .segments()
        .iter()
        .map(|s| (s.sequence, s.uri.as_str()))
        .collect();
    assert_eq!(
        listed,
        vec![
            (2, "/live/seg_2.ts"),
            (3, "/live/seg_3.ts"),
            (4, "/live/seg_4.ts"),
        ]
    );
    assert_eq!(synthesized.media_sequence(), 2);

    let seg_3 = stream.segment(3).unwrap();
    let seg_4 = stream.segment(4).unwrap();

    stream.merge(media_playlist(3, 4, 6).as_bytes(), ItemSource::Cdn)?;
    assert_eq!(stream.window(), vec![3, 4, 5]);
    assert!(Arc::ptr_eq(&seg_3, &stream.segment(3).unwrap()));
    assert!(Arc::ptr_eq(&seg_4, &stream.segment(4).unwrap()));
    assert!(!cache.contains("live/seg_2.ts"));
    assert!(cache.contains("live/seg_5.ts"));
    assert!(!cache.contains("live/seg_6.ts"));

    let synthesized = HlsPlaylist::parse(&stream.playlist())?;
    assert_eq!(synthesized.segments().len(), 3);
    assert_eq!(synthesized.media_sequence(), 3);

    Ok(())
}
