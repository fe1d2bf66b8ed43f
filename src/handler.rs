//! Handler kinds and type dispatch
//!
//! Handler kinds form a forest rooted at [`HandlerKind::Generic`]:
//!
//! ```text
//! Generic
//! ├── Image ── Jpeg, Png, Gif, Tiff, Svg, Xcf
//! ├── Audio ── Ogg
//! ├── Video ── Ogv
//! └── Application ── Pdf
//! ```
//!
//! [`resolve`] sniffs a file, picks a baseline kind from the top-level media
//! type and then applies [`SPECIALIZATIONS`] in priority order until none
//! matches.

use crate::config::{Config, ConfigOverrides};
use crate::error::Result;
use crate::media_file::MediaFile;
use crate::sniff::{self, Sniffed};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HandlerKind {
    Generic,
    Image,
    Jpeg,
    Png,
    Gif,
    Tiff,
    Svg,
    Xcf,
    Audio,
    Ogg,
    Video,
    Ogv,
    Application,
    Pdf,
}

impl HandlerKind {
    pub const ALL: [HandlerKind; 14] = [
        HandlerKind::Generic,
        HandlerKind::Image,
        HandlerKind::Jpeg,
        HandlerKind::Png,
        HandlerKind::Gif,
        HandlerKind::Tiff,
        HandlerKind::Svg,
        HandlerKind::Xcf,
        HandlerKind::Audio,
        HandlerKind::Ogg,
        HandlerKind::Video,
        HandlerKind::Ogv,
        HandlerKind::Application,
        HandlerKind::Pdf,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            HandlerKind::Generic => "GenericFile",
            HandlerKind::Image => "ImageFile",
            HandlerKind::Jpeg => "JPEGFile",
            HandlerKind::Png => "PNGFile",
            HandlerKind::Gif => "GIFFile",
            HandlerKind::Tiff => "TIFFFile",
            HandlerKind::Svg => "SVGFile",
            HandlerKind::Xcf => "XCFFile",
            HandlerKind::Audio => "AudioFile",
            HandlerKind::Ogg => "OGGFile",
            HandlerKind::Video => "VideoFile",
            HandlerKind::Ogv => "OGVFile",
            HandlerKind::Application => "ApplicationFile",
            HandlerKind::Pdf => "PDFFile",
        }
    }

    pub fn parent(&self) -> Option<HandlerKind> {
        match self {
            HandlerKind::Generic => None,
            HandlerKind::Image
            | HandlerKind::Audio
            | HandlerKind::Video
            | HandlerKind::Application => Some(HandlerKind::Generic),
            HandlerKind::Jpeg
            | HandlerKind::Png
            | HandlerKind::Gif
            | HandlerKind::Tiff
            | HandlerKind::Svg
            | HandlerKind::Xcf => Some(HandlerKind::Image),
            HandlerKind::Ogg => Some(HandlerKind::Audio),
            HandlerKind::Ogv => Some(HandlerKind::Video),
            HandlerKind::Pdf => Some(HandlerKind::Application),
        }
    }

    /// This kind followed by its ancestors, ending with `Generic`.
    pub fn lineage(&self) -> Vec<HandlerKind> {
        let mut chain = vec![*self];
        let mut current = *self;
        while let Some(parent) = current.parent() {
            chain.push(parent);
            current = parent;
        }
        chain
    }

    pub fn is_a(&self, ancestor: HandlerKind) -> bool {
        self.lineage().contains(&ancestor)
    }

    /// IANA types recognised as a direct match for this kind.
    pub fn mimetypes(&self) -> &'static [&'static str] {
        match self {
            HandlerKind::Jpeg => &["image/jpeg", "image/pjpeg"],
            HandlerKind::Png => &["image/png", "image/apng"],
            HandlerKind::Gif => &["image/gif"],
            HandlerKind::Tiff => &["image/tiff"],
            HandlerKind::Svg => &["image/svg+xml"],
            HandlerKind::Xcf => &["image/x-xcf", "image/x-compressed-xcf"],
            HandlerKind::Ogg => &["audio/ogg", "audio/vorbis", "audio/x-vorbis+ogg"],
            HandlerKind::Ogv => &["video/ogg", "video/x-theora+ogg"],
            HandlerKind::Pdf => &["application/pdf"],
            _ => &[],
        }
    }

    /// Baseline category for a top-level media type.
    fn baseline(sniffed: &Sniffed) -> HandlerKind {
        match sniffed.media_type() {
            "image" => HandlerKind::Image,
            "audio" => HandlerKind::Audio,
            "video" => HandlerKind::Video,
            "application" => HandlerKind::Application,
            _ => HandlerKind::Generic,
        }
    }
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A rule substituting a more specific kind for a less specific one.
pub struct Specialization {
    pub name: &'static str,
    pub from: &'static [HandlerKind],
    pub to: HandlerKind,
    pub applies: fn(&Sniffed) -> bool,
}

/// Specialization rules, most format-specific first.
pub const SPECIALIZATIONS: &[Specialization] = &[
    Specialization {
        name: "jpeg",
        from: &[HandlerKind::Image],
        to: HandlerKind::Jpeg,
        applies: |s| sniff::is_jpeg(&s.header),
    },
    Specialization {
        name: "png",
        from: &[HandlerKind::Image],
        to: HandlerKind::Png,
        applies: |s| sniff::is_png(&s.header),
    },
    Specialization {
        name: "gif",
        from: &[HandlerKind::Image],
        to: HandlerKind::Gif,
        applies: |s| sniff::is_gif(&s.header),
    },
    Specialization {
        name: "tiff",
        from: &[HandlerKind::Image],
        to: HandlerKind::Tiff,
        applies: |s| sniff::is_tiff(&s.header),
    },
    Specialization {
        name: "xcf",
        from: &[HandlerKind::Image],
        to: HandlerKind::Xcf,
        applies: |s| sniff::is_xcf(&s.header),
    },
    Specialization {
        name: "svg",
        from: &[HandlerKind::Generic, HandlerKind::Application, HandlerKind::Image],
        to: HandlerKind::Svg,
        applies: sniff::is_svg,
    },
    Specialization {
        name: "misreported-image",
        from: &[HandlerKind::Generic, HandlerKind::Application],
        to: HandlerKind::Image,
        applies: |s| sniff::is_xcf(&s.header) || sniff::is_raster_image(&s.header),
    },
    Specialization {
        name: "pdf",
        from: &[HandlerKind::Generic, HandlerKind::Application],
        to: HandlerKind::Pdf,
        applies: |s| sniff::is_pdf(&s.header),
    },
    Specialization {
        name: "ogg-video",
        from: &[HandlerKind::Generic, HandlerKind::Application, HandlerKind::Audio],
        to: HandlerKind::Video,
        applies: |s| sniff::has_ogg_video(&s.header),
    },
    Specialization {
        name: "ogg-audio",
        from: &[HandlerKind::Generic, HandlerKind::Application],
        to: HandlerKind::Audio,
        applies: |s| sniff::is_ogg(&s.header),
    },
    Specialization {
        name: "ogv",
        from: &[HandlerKind::Video],
        to: HandlerKind::Ogv,
        applies: |s| sniff::has_ogg_video(&s.header),
    },
    Specialization {
        name: "ogg",
        from: &[HandlerKind::Audio],
        to: HandlerKind::Ogg,
        applies: |s| sniff::is_ogg(&s.header),
    },
];

/// Pick the most specific kind for sniffed content.
pub fn classify(sniffed: &Sniffed) -> HandlerKind {
    let mut kind = HandlerKind::baseline(sniffed);
    if sniffed.from_extension {
        debug!(
            "{}: {} guessed from the extension, starting from {}",
            sniffed.path.display(),
            sniffed.mime,
            kind
        );
    }
    // Every substitution moves to a different kind, so the chain is bounded
    // by the number of kinds.
    for _ in 0..HandlerKind::ALL.len() {
        let next = SPECIALIZATIONS
            .iter()
            .find(|rule| rule.from.contains(&kind) && (rule.applies)(sniffed));
        match next {
            Some(rule) => {
                debug!("{}: {} -> {} ({})", sniffed.path.display(), kind, rule.to, rule.name);
                kind = rule.to;
            }
            None => break,
        }
    }
    kind
}

/// Open `path` with the most specific handler for its content.
pub fn resolve(path: impl AsRef<Path>) -> Result<MediaFile> {
    resolve_with(path, &ConfigOverrides::new())
}

/// Like [`resolve`], with caller-supplied option overrides.
pub fn resolve_with(path: impl AsRef<Path>, overrides: &ConfigOverrides) -> Result<MediaFile> {
    let sniffed = sniff::sniff(path.as_ref())?;
    let kind = classify(&sniffed);
    let config = Config::for_kind(kind, overrides)?;
    Ok(MediaFile::new(sniffed.path, kind, sniffed.mime, config))
}

/// Open `path` as an explicitly chosen kind, skipping specialization.
pub fn open_as(
    path: impl AsRef<Path>,
    kind: HandlerKind,
    overrides: &ConfigOverrides,
) -> Result<MediaFile> {
    let sniffed = sniff::sniff(path.as_ref())?;
    let config = Config::for_kind(kind, overrides)?;
    Ok(MediaFile::new(sniffed.path, kind, sniffed.mime, config))
}
