//! Analysis routines, registered per handler kind
//!
//! Each table lists only the routines a kind adds or replaces; ancestors'
//! routines are inherited by [`crate::analyze::routines`].

pub mod application;
pub mod color_names;
pub mod generic;
pub mod image;
pub mod media;

use crate::analyze::Routine;
use crate::cache::View;
use crate::error::Result;
use crate::handler::HandlerKind;
use crate::media_file::MediaFile;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

const GENERIC: &[Routine] = &[
    Routine { name: "analyze_exifdata", run: generic::analyze_exifdata },
    Routine { name: "analyze_mimetype", run: generic::analyze_mimetype },
    Routine { name: "analyze_os_stat", run: generic::analyze_os_stat },
];

const IMAGE: &[Routine] = &[
    Routine { name: "analyze_barcode_zbar", run: image::analyze_barcode_zbar },
    Routine { name: "analyze_barcode_zxing", run: image::analyze_barcode_zxing },
    Routine { name: "analyze_color_average", run: image::analyze_color_average },
    Routine { name: "analyze_color_info", run: image::analyze_color_info },
    Routine { name: "analyze_facial_landmarks", run: image::analyze_facial_landmarks },
    Routine { name: "analyze_softwares", run: image::analyze_softwares },
];

const MEDIA: &[Routine] = &[Routine { name: "analyze_ffprobe", run: media::analyze_ffprobe }];

const OGG: &[Routine] = &[Routine { name: "analyze_file_format", run: media::analyze_ogg_format }];

const OGV: &[Routine] = &[Routine { name: "analyze_file_format", run: media::analyze_ogv_format }];

const APPLICATION: &[Routine] = &[Routine {
    name: "analyze_softwares",
    run: application::analyze_softwares,
}];

/// Routines contributed by `kind` itself (not its ancestors).
pub fn routines_for(kind: HandlerKind) -> &'static [Routine] {
    match kind {
        HandlerKind::Generic => GENERIC,
        HandlerKind::Image => IMAGE,
        HandlerKind::Audio | HandlerKind::Video => MEDIA,
        HandlerKind::Ogg => OGG,
        HandlerKind::Ogv => OGV,
        HandlerKind::Application => APPLICATION,
        _ => &[],
    }
}

/// Tags from the `exiftool` view. Empty when the view is unavailable.
pub(crate) fn exif_tags(file: &mut MediaFile) -> Result<Map<String, Value>> {
    Ok(match file.fetch("exiftool")? {
        View::Json(value) => value.as_object().cloned().unwrap_or_default(),
        _ => Map::new(),
    })
}

/// Maps a lowercase prefix of a software tag to a display name.
pub(crate) type SoftwareRule = (&'static str, &'static str);

/// Curated software names found in the given tags.
pub(crate) fn detect_softwares(
    tags: &Map<String, Value>,
    keys: &[&str],
    rules: &[SoftwareRule],
) -> BTreeSet<&'static str> {
    let mut found = BTreeSet::new();
    for key in keys {
        let Some(value) = tags.get(*key) else {
            continue;
        };
        let text = match value {
            Value::String(s) => s.to_lowercase(),
            other => other.to_string().to_lowercase(),
        };
        if let Some((_, name)) = rules.iter().find(|(prefix, _)| text.starts_with(*prefix)) {
            found.insert(*name);
        }
    }
    found
}
