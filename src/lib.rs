//! file_metadata - type dispatch and metadata aggregation for media files
//!
//! A file is sniffed, handed to the most specific handler kind for its
//! content, and analysed by that kind's routines. Routines read derived
//! views (decoded pixels, rasterized copies, probe output) that are computed
//! once per handle and cleaned up when the handle is closed.
//!
//! ```no_run
//! use file_metadata::{resolve, RoutineFilter};
//!
//! let mut file = resolve("photo.jpg")?;
//! let metadata = file.analyze(&RoutineFilter::default())?;
//! println!("{:?}", metadata.get("Color:AverageRGB"));
//! file.close();
//! # Ok::<(), file_metadata::MediaError>(())
//! ```

pub mod analyze;
pub mod cache;
pub mod config;
pub mod error;
pub mod handler;
pub mod media_file;
pub mod pixels;
pub mod probe;
pub mod result;
pub mod routines;
pub mod sniff;
pub mod temp;
pub mod views;

pub use analyze::{
    analyze, analyze_paths, analyze_report, analyze_routines, AnalysisReport, Routine,
    RoutineFilter, RoutineOutcome,
};
pub use cache::{View, ViewParams};
pub use config::{Config, ConfigOverrides};
pub use error::{MediaError, Result};
pub use handler::{open_as, resolve, resolve_with, HandlerKind};
pub use media_file::{with_file, MediaFile};
pub use pixels::PixelBuffer;
pub use result::AnalysisResult;
