//! Ticket image composition.
//!
//! Draws the fixed layout from [`super::layout`] onto a white canvas. No
//! network or database access: the only inputs are the attendee fields and
//! the font and logo files under the assets directory.

use std::path::{Path, PathBuf};

use ab_glyph::{FontArc, PxScale};
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use qrcode::{Color, QrCode};
use thiserror::Error;
use tracing::instrument;

use pycontg_core::TicketReference;

use super::TicketRequest;
use super::layout::{self, LOGOS, QR_ORIGIN, QR_SIZE};
use crate::config::TicketConfig;

/// Font file, relative to the assets directory.
pub const FONT_FILE: &str = "fonts/DejaVuSans.ttf";
/// Logo directory, relative to the assets directory.
pub const IMAGES_DIR: &str = "images";

const QR_QUIET_ZONE: u32 = 4;
const QR_MODULE_PIXELS: u32 = 10;

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Errors raised while composing a ticket.
#[derive(Debug, Error)]
pub enum CompositionError {
    /// A logo file is missing or cannot be decoded.
    #[error("logo asset {file} unavailable: {reason}")]
    Asset { file: String, reason: String },

    /// The font file is missing or not a usable font.
    #[error("font {file} unavailable: {reason}")]
    Font { file: String, reason: String },

    /// The QR payload cannot be encoded.
    #[error("QR encoding failed: {0}")]
    Qr(String),

    /// The blocking worker running the composition panicked or was cancelled.
    #[error("composition worker failed: {0}")]
    Worker(String),
}

/// Renders ticket images from attendee data.
#[derive(Debug, Clone)]
pub struct ArtifactComposer {
    assets_dir: PathBuf,
    event_name: String,
    event_year: u16,
}

impl ArtifactComposer {
    /// Create a composer from the ticket configuration.
    #[must_use]
    pub fn new(config: &TicketConfig) -> Self {
        Self {
            assets_dir: config.assets_dir.clone(),
            event_name: config.event_name.clone(),
            event_year: config.event_year,
        }
    }

    /// Directory holding `fonts/` and `images/`.
    #[must_use]
    pub fn assets_dir(&self) -> &Path {
        &self.assets_dir
    }

    /// Render a ticket.
    ///
    /// Identical inputs produce pixel-identical images. `organization` may be
    /// empty, in which case its line is left out.
    ///
    /// # Errors
    ///
    /// Returns [`CompositionError::Font`] if the font cannot be loaded,
    /// [`CompositionError::Qr`] if the identifier cannot be encoded and
    /// [`CompositionError::Asset`] if a logo cannot be loaded.
    pub fn compose(
        &self,
        participant_id: &str,
        name: &str,
        reference: &TicketReference,
        organization: &str,
        country_city: &str,
    ) -> Result<RgbaImage, CompositionError> {
        let font = self.load_font()?;
        let qr = render_qr(participant_id)?;
        let logos = self.load_logos()?;

        let mut canvas = RgbaImage::from_pixel(layout::CANVAS_WIDTH, layout::CANVAS_HEIGHT, WHITE);

        let title = layout::title(&self.event_name, self.event_year);
        let title_scale = PxScale::from(layout::TITLE_SCALE);
        let (title_width, _) = text_size(title_scale, &font, &title);
        draw_text_mut(
            &mut canvas,
            BLACK,
            layout::centered_x(title_width),
            layout::TITLE_Y,
            title_scale,
            &font,
            &title,
        );

        let text_scale = PxScale::from(layout::TEXT_SCALE);
        for line in layout::text_lines(name, reference.as_str(), country_city, organization) {
            draw_text_mut(
                &mut canvas,
                BLACK,
                layout::TEXT_X,
                line.y,
                text_scale,
                &font,
                &line.text,
            );
        }

        imageops::overlay(&mut canvas, &qr, QR_ORIGIN.0, QR_ORIGIN.1);

        let divider = layout::DIVIDER;
        draw_filled_rect_mut(
            &mut canvas,
            Rect::at(divider.x_start, divider.top()).of_size(divider.width(), divider.thickness),
            BLACK,
        );

        let sizes: Vec<_> = logos.iter().map(RgbaImage::dimensions).collect();
        for (logo, placement) in logos.iter().zip(layout::place_logos(&sizes)) {
            imageops::overlay(&mut canvas, logo, placement.x, placement.y);
        }

        Ok(canvas)
    }

    /// Render a ticket on the blocking thread pool.
    ///
    /// # Errors
    ///
    /// Same as [`Self::compose`], plus [`CompositionError::Worker`] if the
    /// blocking task does not complete.
    #[instrument(skip(self, request), fields(reference = %reference))]
    pub async fn compose_blocking(
        &self,
        request: &TicketRequest,
        reference: &TicketReference,
    ) -> Result<RgbaImage, CompositionError> {
        let composer = self.clone();
        let request = request.clone();
        let reference = reference.clone();

        tokio::task::spawn_blocking(move || {
            composer.compose(
                &request.participant_id,
                &request.name,
                &reference,
                &request.organization,
                &request.country_city,
            )
        })
        .await
        .map_err(|e| CompositionError::Worker(e.to_string()))?
    }

    fn load_font(&self) -> Result<FontArc, CompositionError> {
        let path = self.assets_dir.join(FONT_FILE);
        let font_error = |reason: String| CompositionError::Font {
            file: path.display().to_string(),
            reason,
        };
        let bytes = std::fs::read(&path).map_err(|e| font_error(e.to_string()))?;
        FontArc::try_from_vec(bytes).map_err(|e| font_error(e.to_string()))
    }

    /// Load every partner logo, already scaled into its box.
    fn load_logos(&self) -> Result<Vec<RgbaImage>, CompositionError> {
        let images_dir = self.assets_dir.join(IMAGES_DIR);
        LOGOS
            .iter()
            .map(|spec| {
                let logo = image::open(images_dir.join(spec.file))
                    .map_err(|e| CompositionError::Asset {
                        file: spec.file.to_string(),
                        reason: e.to_string(),
                    })?
                    .to_rgba8();
                let (width, height) = layout::fit(logo.width(), logo.height(), spec.target);
                Ok(imageops::resize(&logo, width, height, FilterType::Lanczos3))
            })
            .collect()
    }
}

/// Render `payload` as a black-on-white QR code of [`QR_SIZE`] pixels.
///
/// # Errors
///
/// Returns [`CompositionError::Qr`] if the payload does not fit in a QR symbol.
pub fn render_qr(payload: &str) -> Result<RgbaImage, CompositionError> {
    let code = QrCode::new(payload.as_bytes()).map_err(|e| CompositionError::Qr(e.to_string()))?;
    let modules = u32::try_from(code.width())
        .map_err(|_| CompositionError::Qr("symbol too large".to_string()))?;
    let colors = code.to_colors();

    let side = (modules + 2 * QR_QUIET_ZONE) * QR_MODULE_PIXELS;
    let bitmap = RgbaImage::from_fn(side, side, |x, y| {
        let module = |pixel: u32| {
            (pixel / QR_MODULE_PIXELS)
                .checked_sub(QR_QUIET_ZONE)
                .filter(|&m| m < modules)
        };
        let dark = match (module(x), module(y)) {
            (Some(mx), Some(my)) => {
                usize::try_from(my * modules + mx)
                    .ok()
                    .and_then(|index| colors.get(index))
                    == Some(&Color::Dark)
            }
            _ => false,
        };
        if dark { BLACK } else { WHITE }
    });

    Ok(imageops::resize(&bitmap, QR_SIZE, QR_SIZE, FilterType::Nearest))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const PARTICIPANT: &str = "5c663cb9-5b6c-4ff6-a2cf-0c87f2f5127c";

    fn static_assets() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("static")
    }

    fn composer(assets_dir: PathBuf) -> ArtifactComposer {
        ArtifactComposer::new(&TicketConfig {
            assets_dir,
            ..TicketConfig::default()
        })
    }

    fn reference() -> TicketReference {
        pycontg_core::reference(PARTICIPANT).unwrap()
    }

    #[test]
    fn test_canvas_size_and_background() {
        let image = composer(static_assets())
            .compose(PARTICIPANT, "tester 1", &reference(), "", "Togo/Lomé")
            .unwrap();
        assert_eq!(image.dimensions(), (1200, 600));
        assert_eq!(*image.get_pixel(1199, 599), WHITE);
        assert_eq!(*image.get_pixel(5, 5), WHITE);
    }

    #[test]
    fn test_composition_is_deterministic() {
        let composer = composer(static_assets());
        let a = composer
            .compose(PARTICIPANT, "tester 1", &reference(), "Python Togo", "Togo/Lomé")
            .unwrap();
        let b = composer
            .compose(PARTICIPANT, "tester 1", &reference(), "Python Togo", "Togo/Lomé")
            .unwrap();
        assert_eq!(a.as_raw(), b.as_raw());
    }

    #[test]
    fn test_divider_is_drawn() {
        let image = composer(static_assets())
            .compose(PARTICIPANT, "tester 1", &reference(), "", "Togo/Lomé")
            .unwrap();
        assert_eq!(*image.get_pixel(600, 400), BLACK);
        assert_eq!(*image.get_pixel(600, 399), BLACK);
        assert_eq!(*image.get_pixel(600, 403), WHITE);
    }

    #[test]
    fn test_organization_changes_only_its_line() {
        let composer = composer(static_assets());
        let without = composer
            .compose(PARTICIPANT, "tester 1", &reference(), "", "Togo/Lomé")
            .unwrap();
        let with = composer
            .compose(PARTICIPANT, "tester 1", &reference(), "Python Togo", "Togo/Lomé")
            .unwrap();

        assert_ne!(without.as_raw(), with.as_raw());
        // The organization band (y = 300..340) is blank without an organization.
        let blank = (50..800).all(|x| (300..340).all(|y| *without.get_pixel(x, y) == WHITE));
        assert!(blank);
    }

    #[test]
    fn test_qr_is_square_and_bordered() {
        let qr = render_qr(PARTICIPANT).unwrap();
        assert_eq!(qr.dimensions(), (QR_SIZE, QR_SIZE));
        assert_eq!(*qr.get_pixel(0, 0), WHITE);
        assert!(qr.pixels().any(|p| *p == BLACK));
    }

    #[test]
    fn test_qr_encodes_full_identifier() {
        let image = composer(static_assets())
            .compose(PARTICIPANT, "tester 1", &reference(), "", "Togo/Lomé")
            .unwrap();
        let x = u32::try_from(QR_ORIGIN.0).unwrap();
        let y = u32::try_from(QR_ORIGIN.1).unwrap();
        let printed = imageops::crop_imm(&image, x, y, QR_SIZE, QR_SIZE).to_image();

        assert_eq!(printed.as_raw(), render_qr(PARTICIPANT).unwrap().as_raw());
        assert_ne!(
            printed.as_raw(),
            render_qr(reference().as_str()).unwrap().as_raw()
        );
    }

    #[test]
    fn test_missing_font() {
        let dir = tempfile::tempdir().unwrap();
        let err = composer(dir.path().to_path_buf())
            .compose(PARTICIPANT, "tester 1", &reference(), "", "Togo/Lomé")
            .unwrap_err();
        assert!(matches!(err, CompositionError::Font { .. }));
    }

    #[test]
    fn test_invalid_font() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("fonts")).unwrap();
        std::fs::write(dir.path().join(FONT_FILE), b"not a font").unwrap();
        let err = composer(dir.path().to_path_buf())
            .compose(PARTICIPANT, "tester 1", &reference(), "", "Togo/Lomé")
            .unwrap_err();
        assert!(matches!(err, CompositionError::Font { .. }));
    }

    #[test]
    fn test_missing_logo() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("fonts")).unwrap();
        std::fs::copy(static_assets().join(FONT_FILE), dir.path().join(FONT_FILE)).unwrap();

        let err = composer(dir.path().to_path_buf())
            .compose(PARTICIPANT, "tester 1", &reference(), "", "Togo/Lomé")
            .unwrap_err();
        match err {
            CompositionError::Asset { file, .. } => assert_eq!(file, "pythontogo.png"),
            other => panic!("expected asset error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_compose_blocking_matches_sync() {
        let composer = composer(static_assets());
        let request = TicketRequest {
            participant_id: PARTICIPANT.to_string(),
            name: "tester 1".to_string(),
            email: pycontg_core::Email::parse("t@pytogo.org").unwrap(),
            organization: String::new(),
            country_city: "Togo/Lomé".to_string(),
        };
        let from_worker = composer.compose_blocking(&request, &reference()).await.unwrap();
        let direct = composer
            .compose(PARTICIPANT, "tester 1", &reference(), "", "Togo/Lomé")
            .unwrap();
        assert_eq!(from_worker.as_raw(), direct.as_raw());
    }
}
