use super::{ExtractionError, ImageMetadata};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::path::Path;
use tracing::{debug, trace};

const SUPPORTED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

/// Case-insensitive check against the formats the slideshow can display.
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
}

/// Read pixel dimensions and capture date from an image file.
///
/// Dimensions are mandatory: a file whose header cannot be decoded is an
/// error. The capture date is best effort and absent when the file carries no
/// usable EXIF date.
pub fn extract(path: &Path) -> Result<ImageMetadata, ExtractionError> {
    let (width, height) = image::ImageReader::open(path)?
        .with_guessed_format()?
        .into_dimensions()?;

    Ok(ImageMetadata {
        width,
        height,
        captured_at: extract_capture_date(path),
    })
}

fn extract_capture_date(path: &Path) -> Option<DateTime<Utc>> {
    let exif = match rexif::parse_file(path) {
        Ok(exif) => exif,
        Err(e) => {
            trace!("No EXIF data for {}: {}", path.display(), e);
            return None;
        }
    };

    let field = |tag: rexif::ExifTag| {
        exif.entries
            .iter()
            .find(|entry| entry.tag == tag)
            .map(|entry| entry.value_more_readable.to_string())
    };

    let date = capture_date_from_fields(
        field(rexif::ExifTag::DateTime).as_deref(),
        field(rexif::ExifTag::DateTimeOriginal).as_deref(),
    );
    if let Some(date) = date {
        debug!("Capture date for {}: {}", path.display(), date);
    }
    date
}

/// `DateTime` is the primary field and wins whenever it parses;
/// `DateTimeOriginal` is only consulted as a fallback.
pub(crate) fn capture_date_from_fields(
    primary: Option<&str>,
    fallback: Option<&str>,
) -> Option<DateTime<Utc>> {
    primary
        .and_then(parse_exif_datetime)
        .or_else(|| fallback.and_then(parse_exif_datetime))
}

pub(crate) fn parse_exif_datetime(value: &str) -> Option<DateTime<Utc>> {
    // EXIF datetime format: "2005:07:30 07:22:46"
    let value = value.trim().trim_end_matches('\0');

    const DATETIME_FORMATS: [&str; 3] = ["%Y:%m:%d %H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y/%m/%d %H:%M:%S"];
    const DATE_FORMATS: [&str; 3] = ["%Y:%m:%d", "%Y-%m-%d", "%Y/%m/%d"];

    for format in &DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc));
        }
    }

    for format in &DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format)
            && let Some(naive) = date.and_hms_opt(0, 0, 0)
        {
            return Some(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc));
        }
    }

    None
}
