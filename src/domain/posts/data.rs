use time::macros::datetime;

use crate::domain::entities::{PostId, PostRecord};

/// Seed content for the in-memory store, newest first.
pub fn demo_posts() -> Vec<PostRecord> {
    vec![
        PostRecord {
            id: PostId::from("5"),
            title: "Live counters without a websocket".into(),
            content: "<p>A change feed does not need a socket. Polling one row at a steady cadence and \
                      diffing the result is enough for a counter that only ever goes up.</p>\
                      <p>The interesting part is discarding answers that arrive after the reader has \
                      moved on.</p>"
                .into(),
            tags: vec!["realtime".into(), "rust".into()],
            image: None,
            excerpt: Some("Polling one row and diffing it is enough for a monotonic counter.".into()),
            created_at: datetime!(2025-03-18 09:00 UTC),
            updated_at: datetime!(2025-03-18 09:00 UTC),
            claps: 12,
        },
        PostRecord {
            id: PostId::from("4"),
            title: "Animating a filtered grid".into(),
            content: "<p>Capture every card's position, apply the filter, then animate each surviving \
                      card from where it was to where it is now.</p>"
                .into(),
            tags: vec!["css".into(), "design".into()],
            image: Some("https://images.example.com/grid.png".into()),
            excerpt: Some("First, last, invert, play: moving cards after a filter change.".into()),
            created_at: datetime!(2025-02-27 14:30 UTC),
            updated_at: datetime!(2025-03-01 08:15 UTC),
            claps: 7,
        },
        PostRecord {
            id: PostId::from("3"),
            title: "Debouncing search input".into(),
            content: "<p>Typing fast should not recompute the list on every keystroke. Wait for a quiet \
                      period of 300 milliseconds, then filter once.</p>"
                .into(),
            tags: vec!["javascript".into(), "design".into()],
            image: None,
            excerpt: None,
            created_at: datetime!(2025-01-09 11:45 UTC),
            updated_at: datetime!(2025-01-09 11:45 UTC),
            claps: 3,
        },
        PostRecord {
            id: PostId::from("2"),
            title: "Read-modify-write and lost updates".into(),
            content: "<p>Two clients read 7, both write 8. One applause is gone. An atomic increment on \
                      the server is the only real fix.</p>"
                .into(),
            tags: vec!["database".into(), "realtime".into()],
            image: None,
            excerpt: Some("Why two concurrent claps can end up counting as one.".into()),
            created_at: datetime!(2024-12-02 20:10 UTC),
            updated_at: datetime!(2024-12-02 20:10 UTC),
            claps: 21,
        },
        PostRecord {
            id: PostId::from("1"),
            title: "Hello, world".into(),
            content: "<p>First post. The admin editor works.</p>".into(),
            tags: Vec::new(),
            image: None,
            excerpt: None,
            created_at: datetime!(2024-11-20 07:00 UTC),
            updated_at: datetime!(2024-11-20 07:00 UTC),
            claps: 0,
        },
    ]
}
