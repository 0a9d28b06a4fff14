use bytes::Bytes;
use tokio::time::Instant;

/// A file handed over by the broadcast receiver.
///
/// The delivery protocol itself is opaque here, only the object metadata and
/// its body are kept.
#[derive(Debug, Clone)]
pub struct BroadcastFile {
    /// Server-relative location without leading slash, e.g. `live/ch1/seg_12.ts`
    pub content_location: String,
    /// Transfer object identifier assigned by the sender
    pub transfer_id: u64,
    pub content_type: String,
    pub buffer: Bytes,

    pub received_at: Instant,
}

impl BroadcastFile {
    pub fn new(
        content_location: impl Into<String>,
        transfer_id: u64,
        content_type: impl Into<String>,
        buffer: impl Into<Bytes>,
    ) -> Self {
        let content_location: String = content_location.into();
        Self {
            content_location: content_location.trim_start_matches('/').to_string(),
            transfer_id,
            content_type: content_type.into(),
            buffer: buffer.into(),
            received_at: Instant::now(),
        }
    }
}
