use std::fmt::Write as _;

/// HLS segment length shared by every rendition.
pub const SEGMENT_SECONDS: u32 = 6;

/// One output of the adaptive ladder. Bitrates are in kbit/s; `bandwidth` is the declared
/// peak advertised to players in bit/s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rendition {
    pub name: &'static str,
    pub width: u32,
    pub height: u32,
    pub video_kbps: u32,
    pub max_kbps: u32,
    pub buffer_kbps: u32,
    pub audio_kbps: u32,
    pub bandwidth: u32,
}

impl Rendition {
    pub fn playlist_name(&self) -> String {
        format!("{}.m3u8", self.name)
    }

    pub fn segment_pattern(&self) -> String {
        format!("{}_%04d.ts", self.name)
    }

    pub fn resolution(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

/// Descending quality. Order is significant: it is both the encode order and the
/// order of entries in the master manifest.
pub const LADDER: [Rendition; 5] = [
    Rendition {
        name: "1080p",
        width: 1920,
        height: 1080,
        video_kbps: 4000,
        max_kbps: 5000,
        buffer_kbps: 10000,
        audio_kbps: 192,
        bandwidth: 6_000_000,
    },
    Rendition {
        name: "720p",
        width: 1280,
        height: 720,
        video_kbps: 2800,
        max_kbps: 3400,
        buffer_kbps: 5000,
        audio_kbps: 128,
        bandwidth: 3_400_000,
    },
    Rendition {
        name: "480p",
        width: 854,
        height: 480,
        video_kbps: 1400,
        max_kbps: 1700,
        buffer_kbps: 2500,
        audio_kbps: 96,
        bandwidth: 1_700_000,
    },
    Rendition {
        name: "360p",
        width: 640,
        height: 360,
        video_kbps: 800,
        max_kbps: 1000,
        buffer_kbps: 1500,
        audio_kbps: 96,
        bandwidth: 1_000_000,
    },
    Rendition {
        name: "144p",
        width: 256,
        height: 144,
        video_kbps: 400,
        max_kbps: 500,
        buffer_kbps: 800,
        audio_kbps: 64,
        bandwidth: 500_000,
    },
];

/// Builds the master playlist listing every rendition's sub-manifest in ladder order.
pub fn master_manifest(ladder: &[Rendition]) -> String {
    let mut out = String::from("#EXTM3U\n#EXT-X-VERSION:3\n");
    for rendition in ladder {
        let _ = writeln!(
            out,
            "#EXT-X-STREAM-INF:BANDWIDTH={},RESOLUTION={},NAME=\"{}\"",
            rendition.bandwidth,
            rendition.resolution(),
            rendition.name
        );
        let _ = writeln!(out, "{}", rendition.playlist_name());
    }
    out
}
