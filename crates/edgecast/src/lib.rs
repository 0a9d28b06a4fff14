pub mod cache;
pub mod cdn;
pub mod error;
pub mod file;
pub mod gateway;
pub mod manifest;
pub mod playlist;
pub mod segment;
pub mod stream;
pub mod util;

pub use cache::{CacheSettings, CacheStore, ItemContent};
pub use cdn::CdnClient;
pub use error::{EdgeError, EdgeResult};
pub use file::BroadcastFile;
pub use gateway::{Gateway, GatewaySettings, GatewayStatus};
pub use playlist::{HlsPlaylist, PlaylistEntry};
pub use segment::{ItemSource, Segment};
pub use stream::{
    ContentStream, DashStream, DeliveryProtocol, SeamlessStream, Stream, StreamSettings,
    StreamStatus,
};
pub use util::{http::HttpClient, path::PlaylistLocation};

// ┌──────────────────┐  playlist   ┌──────────────────────┐
// │                  ├─────────────►                      │
// │    Broadcast     │             │                      │   add / remove   ┌──────────────┐
// │     receiver     │  segments   │    SeamlessStream    ├──────────────────►              │
// │                  ├─────────────►                      │                  │              │
// └──────────────────┘             │   [window][pending]  │                  │  CacheStore  ├───► players
//                                  │                      │                  │              │
// ┌──────────────────┐  playlist   │                      │   lazy segment   │   [sweep]    │
// │       CDN        ├─────────────►                      ◄──────────────────┤              │
// │                  ◄─────────────┤        tick          │                  └──────────────┘
// └──────────────────┘  segments   └──────────────────────┘
