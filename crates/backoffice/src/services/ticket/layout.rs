//! Fixed ticket layout.
//!
//! Everything here is pure arithmetic over constants and image sizes, so the
//! geometry can be tested without fonts, logos or a canvas.

/// Canvas width in pixels.
pub const CANVAS_WIDTH: u32 = 1200;
/// Canvas height in pixels.
pub const CANVAS_HEIGHT: u32 = 600;

/// Baseline of the title block.
pub const TITLE_Y: i32 = 30;
/// Title size in pixels.
pub const TITLE_SCALE: f32 = 50.0;

/// Left margin of the attendee lines.
pub const TEXT_X: i32 = 50;
/// Attendee line size in pixels.
pub const TEXT_SCALE: f32 = 30.0;

const NAME_Y: i32 = 120;
const REFERENCE_Y: i32 = 180;
const COUNTRY_Y: i32 = 240;
const ORGANIZATION_Y: i32 = 300;

/// Side of the (square) QR code.
pub const QR_SIZE: u32 = 230;
/// Top-left corner of the QR code.
pub const QR_ORIGIN: (i64, i64) = (900, 150);

/// Horizontal divider between attendee data and the logo strip.
pub const DIVIDER: Divider = Divider {
    x_start: 50,
    x_end: 1150,
    y: 400,
    thickness: 2,
};

/// Top of the logo band.
pub const LOGO_BAND_Y: i64 = 460;
/// Height logos are vertically centered in.
pub const LOGO_BAND_HEIGHT: i64 = 70;
/// Gap between two logos.
pub const LOGO_SPACING: i64 = 40;

const DEFAULT_LOGO_BOX: BoxSize = BoxSize::new(110, 60);

/// Partner marks, left to right.
pub const LOGOS: [LogoSpec; 7] = [
    LogoSpec::new("Python Togo", "pythontogo.png", BoxSize::new(180, 180)),
    LogoSpec::new("PSF", "psf.png", BoxSize::new(300, 70)),
    LogoSpec::new("AFPy", "afpy.png", DEFAULT_LOGO_BOX),
    LogoSpec::new("BPD", "bpd_stacked_us5ika.png", DEFAULT_LOGO_BOX),
    LogoSpec::new("TAHAGA", "tahaga.png", DEFAULT_LOGO_BOX),
    LogoSpec::new("Django", "django-logo-positive.png", DEFAULT_LOGO_BOX),
    LogoSpec::new("GitHub", "github-logo.png", DEFAULT_LOGO_BOX),
];

/// A horizontal line drawn as a filled band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Divider {
    pub x_start: i32,
    pub x_end: i32,
    pub y: i32,
    pub thickness: u32,
}

impl Divider {
    /// Top edge of the band, so that it straddles `y`.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub const fn top(&self) -> i32 {
        self.y - (self.thickness / 2) as i32
    }

    /// Width of the band, both ends included.
    #[must_use]
    pub const fn width(&self) -> u32 {
        (self.x_end - self.x_start + 1).unsigned_abs()
    }
}

/// Bounding box a logo is scaled into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxSize {
    pub width: u32,
    pub height: u32,
}

impl BoxSize {
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// A partner mark: display name, asset file under `images/`, target box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogoSpec {
    pub name: &'static str,
    pub file: &'static str,
    pub target: BoxSize,
}

impl LogoSpec {
    const fn new(name: &'static str, file: &'static str, target: BoxSize) -> Self {
        Self { name, file, target }
    }
}

/// One line of attendee text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextLine {
    pub text: String,
    pub y: i32,
}

/// Top-left corner of a placed logo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub x: i64,
    pub y: i64,
}

/// Ticket title, e.g. `Ticket - PyCon Togo 2025`.
#[must_use]
pub fn title(event_name: &str, year: u16) -> String {
    format!("Ticket - {event_name} {year}")
}

/// X coordinate that centers a block of `width` pixels on the canvas.
#[must_use]
pub fn centered_x(width: u32) -> i32 {
    let offset = (i64::from(CANVAS_WIDTH) - i64::from(width)).div_euclid(2);
    i32::try_from(offset).unwrap_or(0)
}

/// Attendee lines in drawing order.
///
/// The organization line is omitted when `organization` is blank.
#[must_use]
pub fn text_lines(
    name: &str,
    reference: &str,
    country_city: &str,
    organization: &str,
) -> Vec<TextLine> {
    let mut lines = vec![
        TextLine {
            text: format!("Name : {name}"),
            y: NAME_Y,
        },
        TextLine {
            text: format!("Reference : {reference}"),
            y: REFERENCE_Y,
        },
        TextLine {
            text: format!("Country/City : {country_city}"),
            y: COUNTRY_Y,
        },
    ];
    let organization = organization.trim();
    if !organization.is_empty() {
        lines.push(TextLine {
            text: format!("Company/Community : {organization}"),
            y: ORGANIZATION_Y,
        });
    }
    lines
}

/// Scale `(width, height)` into `target`, keeping the aspect ratio.
///
/// Dimensions are truncated, never rounded up, and never drop below one pixel.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn fit(width: u32, height: u32, target: BoxSize) -> (u32, u32) {
    let (width, height) = (width.max(1), height.max(1));
    let ratio = f64::min(
        f64::from(target.width) / f64::from(width),
        f64::from(target.height) / f64::from(height),
    );
    let scaled = |side: u32| ((f64::from(side) * ratio) as u32).max(1);
    (scaled(width), scaled(height))
}

/// Lay out scaled logos left to right, group centered on the canvas.
///
/// Each logo is vertically centered in the band starting at
/// [`LOGO_BAND_Y`]; tall logos overflow the band upward and downward.
#[must_use]
pub fn place_logos(sizes: &[(u32, u32)]) -> Vec<Placement> {
    let Some(gaps) = sizes.len().checked_sub(1) else {
        return Vec::new();
    };
    let gaps = i64::try_from(gaps).unwrap_or(i64::MAX);
    let total_width: i64 = sizes.iter().map(|&(w, _)| i64::from(w)).sum::<i64>()
        + gaps.saturating_mul(LOGO_SPACING);

    let mut x = (i64::from(CANVAS_WIDTH) - total_width).div_euclid(2);
    sizes
        .iter()
        .map(|&(width, height)| {
            let placement = Placement {
                x,
                y: LOGO_BAND_Y + (LOGO_BAND_HEIGHT - i64::from(height)).div_euclid(2),
            };
            x += i64::from(width) + LOGO_SPACING;
            placement
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title() {
        assert_eq!(title("PyCon Togo", 2025), "Ticket - PyCon Togo 2025");
    }

    #[test]
    fn test_lines_without_organization() {
        let lines = text_lines("tester 1", "PYCONTG-2025-5C663C", "Togo/Lomé", "");
        assert_eq!(
            lines,
            vec![
                TextLine {
                    text: "Name : tester 1".to_string(),
                    y: 120
                },
                TextLine {
                    text: "Reference : PYCONTG-2025-5C663C".to_string(),
                    y: 180
                },
                TextLine {
                    text: "Country/City : Togo/Lomé".to_string(),
                    y: 240
                },
            ]
        );
    }

    #[test]
    fn test_blank_organization_is_omitted() {
        assert_eq!(text_lines("a", "b", "c", "   ").len(), 3);
    }

    #[test]
    fn test_organization_line() {
        let lines = text_lines("a", "b", "c", "Python Togo");
        assert_eq!(
            lines.last(),
            Some(&TextLine {
                text: "Company/Community : Python Togo".to_string(),
                y: 300
            })
        );
    }

    #[test]
    fn test_fit_preserves_aspect_ratio() {
        assert_eq!(fit(200, 100, BoxSize::new(110, 60)), (110, 55));
        assert_eq!(fit(100, 200, BoxSize::new(110, 60)), (30, 60));
        assert_eq!(fit(400, 400, BoxSize::new(180, 180)), (180, 180));
        assert_eq!(fit(600, 140, BoxSize::new(300, 70)), (300, 70));
    }

    #[test]
    fn test_fit_upscales_small_logos() {
        assert_eq!(fit(22, 12, BoxSize::new(110, 60)), (110, 60));
    }

    #[test]
    fn test_fit_never_collapses() {
        assert_eq!(fit(10_000, 1, BoxSize::new(110, 60)), (110, 1));
        assert_eq!(fit(0, 0, BoxSize::new(110, 60)), (60, 60));
    }

    #[test]
    fn test_logo_group_is_centered() {
        let placements = place_logos(&[(100, 70), (50, 30)]);
        // total = 100 + 40 + 50 = 190, start = (1200 - 190) / 2
        assert_eq!(
            placements,
            vec![Placement { x: 505, y: 460 }, Placement { x: 645, y: 480 }]
        );
    }

    #[test]
    fn test_tall_logo_floors_toward_negative() {
        let placements = place_logos(&[(180, 180), (110, 71)]);
        assert_eq!(placements[0].y, 405);
        assert_eq!(placements[1].y, 459);
    }

    #[test]
    fn test_odd_total_width_floors() {
        let placements = place_logos(&[(101, 70)]);
        assert_eq!(placements[0].x, 549);
    }

    #[test]
    fn test_no_logos() {
        assert!(place_logos(&[]).is_empty());
    }

    #[test]
    fn test_logo_order() {
        let names: Vec<_> = LOGOS.iter().map(|logo| logo.name).collect();
        assert_eq!(
            names,
            ["Python Togo", "PSF", "AFPy", "BPD", "TAHAGA", "Django", "GitHub"]
        );
    }

    #[test]
    fn test_centered_x() {
        assert_eq!(centered_x(500), 350);
        assert_eq!(centered_x(1300), -50);
    }

    #[test]
    fn test_divider_band() {
        assert_eq!(DIVIDER.top(), 399);
        assert_eq!(DIVIDER.width(), 1101);
    }
}
