//! Plate redaction: blurs detected plate regions and writes a modified copy
//! of the image, leaving everything outside the padded boxes untouched.

use std::fs;
use std::path::PathBuf;

use image::{GenericImageView, imageops};
use log::debug;
use plate_batch_types::{Detection, ImageHandle, PlateBox};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RedactError {
    #[error("configuration error: {message}")]
    Configuration { message: String },

    #[error("failed to decode {name}: {source}")]
    Decode {
        name: String,
        source: image::ImageError,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("failed to create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl RedactError {
    fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RedactionSettings {
    /// Blur intensity, 1 (light) to 10 (heavy).
    pub blur_amount: u32,
    pub output_dir: PathBuf,
}

impl RedactionSettings {
    /// Blur amount and output directory must be given together; one without
    /// the other is a usage error caught before any image is processed.
    pub fn from_options(
        blur_amount: Option<u32>,
        output_dir: Option<PathBuf>,
    ) -> Result<Option<Self>, RedactError> {
        match (blur_amount, output_dir) {
            (Some(blur_amount), Some(output_dir)) => {
                if !(1..=10).contains(&blur_amount) {
                    return Err(RedactError::configuration(
                        "blur amount must be between 1 and 10",
                    ));
                }
                Ok(Some(Self {
                    blur_amount,
                    output_dir,
                }))
            }
            (None, None) => Ok(None),
            (Some(_), None) => Err(RedactError::configuration(
                "blur amount requires an output directory",
            )),
            (None, Some(_)) => Err(RedactError::configuration(
                "blur output directory requires a blur amount",
            )),
        }
    }
}

pub struct Redactor {
    settings: RedactionSettings,
}

impl Redactor {
    pub fn new(settings: RedactionSettings) -> Result<Self, RedactError> {
        fs::create_dir_all(&settings.output_dir).map_err(|source| RedactError::OutputDir {
            path: settings.output_dir.clone(),
            source,
        })?;
        Ok(Self { settings })
    }

    /// Blurs each detection's padded region and writes the composited image
    /// under the original base filename. Returns the written path, or `None`
    /// when there is nothing to redact (no decode, no write).
    pub fn redact(
        &self,
        image: &ImageHandle,
        detections: &[Detection],
    ) -> Result<Option<PathBuf>, RedactError> {
        if detections.is_empty() {
            debug!("{}: no detections, skipping redaction", image.name());
            return Ok(None);
        }

        let mut canvas =
            image::load_from_memory(image.data()).map_err(|source| RedactError::Decode {
                name: image.name().to_string(),
                source,
            })?;
        let (width, height) = (canvas.width(), canvas.height());
        let sigma = blur_sigma(self.settings.blur_amount);

        for detection in detections {
            let Some(rect) = padded_rect(&detection.plate_box, width, height) else {
                continue;
            };
            let blurred = canvas
                .crop_imm(rect.x, rect.y, rect.width, rect.height)
                .blur(sigma);
            imageops::replace(&mut canvas, &blurred, rect.x as i64, rect.y as i64);
        }

        let path = self.settings.output_dir.join(image.name());
        canvas.save(&path).map_err(|source| RedactError::Write {
            path: path.clone(),
            source,
        })?;
        debug!("{}: wrote redacted copy to {}", image.name(), path.display());
        Ok(Some(path))
    }
}

fn blur_sigma(amount: u32) -> f32 {
    amount as f32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PixelRect {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

/// Expands a detection box 5% outward on each axis (min edges scaled by
/// 0.95, max edges by 1.05), clamped to the image bounds.
fn padded_rect(plate_box: &PlateBox, image_width: u32, image_height: u32) -> Option<PixelRect> {
    let x0 = (plate_box.xmin * 0.95).floor().max(0.0) as u32;
    let y0 = (plate_box.ymin * 0.95).floor().max(0.0) as u32;
    let x1 = ((plate_box.xmax * 1.05).ceil().max(0.0) as u32).min(image_width);
    let y1 = ((plate_box.ymax * 1.05).ceil().max(0.0) as u32).min(image_height);
    if x1 <= x0 || y1 <= y0 || x0 >= image_width || y0 >= image_height {
        return None;
    }
    Some(PixelRect {
        x: x0,
        y: y0,
        width: x1 - x0,
        height: y1 - y0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb, RgbImage};

    fn detection(xmin: f32, ymin: f32, xmax: f32, ymax: f32) -> Detection {
        Detection {
            plate_box: PlateBox {
                xmin,
                ymin,
                xmax,
                ymax,
            },
            plate: Some("abc123".to_string()),
            score: Some(0.9),
        }
    }

    fn gradient_png(width: u32, height: u32) -> Vec<u8> {
        let img: RgbImage = ImageBuffer::from_fn(width, height, |x, y| {
            Rgb([(x * 7 % 256) as u8, (y * 11 % 256) as u8, ((x + y) % 256) as u8])
        });
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn padding_expands_box_outward() {
        let rect = padded_rect(
            &PlateBox {
                xmin: 10.0,
                ymin: 10.0,
                xmax: 50.0,
                ymax: 50.0,
            },
            100,
            100,
        )
        .unwrap();
        // (9.5, 9.5)-(52.5, 52.5) rounded outward to whole pixels.
        assert_eq!(
            rect,
            PixelRect {
                x: 9,
                y: 9,
                width: 44,
                height: 44,
            }
        );
    }

    #[test]
    fn padding_clamps_to_image_bounds() {
        let rect = padded_rect(
            &PlateBox {
                xmin: 0.0,
                ymin: 0.0,
                xmax: 200.0,
                ymax: 200.0,
            },
            100,
            100,
        )
        .unwrap();
        assert_eq!(
            rect,
            PixelRect {
                x: 0,
                y: 0,
                width: 100,
                height: 100,
            }
        );
        assert!(
            padded_rect(
                &PlateBox {
                    xmin: 150.0,
                    ymin: 150.0,
                    xmax: 160.0,
                    ymax: 160.0,
                },
                100,
                100,
            )
            .is_none()
        );
    }

    #[test]
    fn redaction_only_touches_padded_region() {
        let dir = tempfile::tempdir().unwrap();
        let redactor = Redactor::new(RedactionSettings {
            blur_amount: 5,
            output_dir: dir.path().to_path_buf(),
        })
        .unwrap();

        let source_bytes = gradient_png(100, 100);
        let handle = ImageHandle::new("car.png", source_bytes.clone());
        let written = redactor
            .redact(&handle, &[detection(10.0, 10.0, 50.0, 50.0)])
            .unwrap()
            .expect("one detection produces a redacted copy");

        let original = image::load_from_memory(&source_bytes).unwrap().to_rgb8();
        let redacted = image::open(&written).unwrap().to_rgb8();
        let rect = padded_rect(
            &PlateBox {
                xmin: 10.0,
                ymin: 10.0,
                xmax: 50.0,
                ymax: 50.0,
            },
            100,
            100,
        )
        .unwrap();

        let mut changed_inside = false;
        for y in 0..100u32 {
            for x in 0..100u32 {
                let inside = x >= rect.x
                    && x < rect.x + rect.width
                    && y >= rect.y
                    && y < rect.y + rect.height;
                let same = original.get_pixel(x, y) == redacted.get_pixel(x, y);
                if inside {
                    changed_inside |= !same;
                } else {
                    assert!(same, "pixel ({x},{y}) outside the padded box changed");
                }
            }
        }
        assert!(changed_inside, "blur left the plate region untouched");
    }

    #[test]
    fn zero_detections_write_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let redactor = Redactor::new(RedactionSettings {
            blur_amount: 5,
            output_dir: dir.path().to_path_buf(),
        })
        .unwrap();
        let handle = ImageHandle::new("car.png", gradient_png(10, 10));
        assert!(redactor.redact(&handle, &[]).unwrap().is_none());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn blur_options_must_be_given_together() {
        assert!(matches!(
            RedactionSettings::from_options(Some(5), None),
            Err(RedactError::Configuration { .. })
        ));
        assert!(matches!(
            RedactionSettings::from_options(None, Some("out".into())),
            Err(RedactError::Configuration { .. })
        ));
        assert!(RedactionSettings::from_options(None, None).unwrap().is_none());
        assert!(
            RedactionSettings::from_options(Some(3), Some("out".into()))
                .unwrap()
                .is_some()
        );
        assert!(matches!(
            RedactionSettings::from_options(Some(11), Some("out".into())),
            Err(RedactError::Configuration { .. })
        ));
    }
}
