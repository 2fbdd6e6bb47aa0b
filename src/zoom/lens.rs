//! Physical lens classes and the zoom-level ordering

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Physical camera module class
///
/// Variants are declared narrowest first so the derived ordering ranks a
/// wider angle of view as greater (`Telephoto < Wide < Ultrawide`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LensKind {
    Telephoto,
    Wide,
    Ultrawide,
}

impl LensKind {
    /// All lens kinds, narrowest first
    pub const ALL: [LensKind; 3] = [LensKind::Telephoto, LensKind::Wide, LensKind::Ultrawide];

    /// Zoom factor the lens is calibrated to when it becomes active
    pub fn default_zoom(self) -> f64 {
        match self {
            LensKind::Telephoto => 3.0,
            LensKind::Wide => 1.0,
            LensKind::Ultrawide => 0.5,
        }
    }

    /// Human readable label
    pub fn display_name(self) -> &'static str {
        match self {
            LensKind::Telephoto => "Telephoto camera",
            LensKind::Wide => "Wide camera",
            LensKind::Ultrawide => "Ultrawide camera",
        }
    }

    /// Next narrower lens, saturating at telephoto
    pub fn zoomed_in(self) -> LensKind {
        match self {
            LensKind::Ultrawide => LensKind::Wide,
            LensKind::Wide => LensKind::Telephoto,
            LensKind::Telephoto => LensKind::Telephoto,
        }
    }

    /// Next wider lens, saturating at ultrawide
    pub fn zoomed_out(self) -> LensKind {
        match self {
            LensKind::Telephoto => LensKind::Wide,
            LensKind::Wide => LensKind::Ultrawide,
            LensKind::Ultrawide => LensKind::Ultrawide,
        }
    }
}

/// Label for a possibly unidentified lens
pub fn display_name(lens: Option<LensKind>) -> &'static str {
    lens.map_or("Unknown", LensKind::display_name)
}

impl fmt::Display for LensKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LensKind::Telephoto => "telephoto",
            LensKind::Wide => "wide",
            LensKind::Ultrawide => "ultrawide",
        };
        f.write_str(name)
    }
}

impl FromStr for LensKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "telephoto" | "tele" => Ok(LensKind::Telephoto),
            "wide" => Ok(LensKind::Wide),
            "ultrawide" | "ultra-wide" | "ultra" => Ok(LensKind::Ultrawide),
            other => Err(format!("unknown lens kind: {}", other)),
        }
    }
}

/// A lens at a digital zoom factor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomLevel {
    pub lens: LensKind,
    pub scale: f64,
}

impl ZoomLevel {
    pub fn new(lens: LensKind, scale: f64) -> Self {
        Self { lens, scale }
    }
}

/// Orders two zoom levels, wider ranking greater.
///
/// A strictly wider lens always wins, whatever either scale is. Only when
/// both levels sit on the same lens does the scale decide, with the larger
/// scale ranking greater.
pub fn order(a: ZoomLevel, b: ZoomLevel) -> Ordering {
    match a.lens.cmp(&b.lens) {
        Ordering::Equal => a.scale.total_cmp(&b.scale),
        lens_order => lens_order,
    }
}

impl PartialOrd for ZoomLevel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(order(*self, *other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_zoom() {
        assert_eq!(LensKind::Telephoto.default_zoom(), 3.0);
        assert_eq!(LensKind::Wide.default_zoom(), 1.0);
        assert_eq!(LensKind::Ultrawide.default_zoom(), 0.5);
    }

    #[test]
    fn test_display_names() {
        assert_eq!(LensKind::Telephoto.display_name(), "Telephoto camera");
        assert_eq!(display_name(Some(LensKind::Ultrawide)), "Ultrawide camera");
        assert_eq!(display_name(None), "Unknown");
    }

    #[test]
    fn test_lens_neighbours_saturate() {
        assert_eq!(LensKind::Wide.zoomed_out().zoomed_in(), LensKind::Wide);
        assert_eq!(LensKind::Telephoto.zoomed_in(), LensKind::Telephoto);
        assert_eq!(LensKind::Ultrawide.zoomed_out(), LensKind::Ultrawide);
        assert_eq!(LensKind::Ultrawide.zoomed_in(), LensKind::Wide);
        assert_eq!(LensKind::Telephoto.zoomed_out(), LensKind::Wide);
    }

    #[test]
    fn test_parse_lens_kind() {
        assert_eq!("Wide".parse::<LensKind>(), Ok(LensKind::Wide));
        assert_eq!("ultra-wide".parse::<LensKind>(), Ok(LensKind::Ultrawide));
        assert!("fisheye".parse::<LensKind>().is_err());
    }

    #[test]
    fn test_order_is_irreflexive() {
        let level = ZoomLevel::new(LensKind::Wide, 2.0);
        assert_eq!(order(level, level), Ordering::Equal);
        assert!(!(level < level));
    }

    #[test]
    fn test_order_same_lens_follows_scale() {
        let low = ZoomLevel::new(LensKind::Telephoto, 3.0);
        let high = ZoomLevel::new(LensKind::Telephoto, 4.5);
        assert_eq!(order(high, low), Ordering::Greater);
        assert_eq!(order(low, high), Ordering::Less);
    }

    #[test]
    fn test_order_cross_lens_ignores_scale() {
        let tele = ZoomLevel::new(LensKind::Telephoto, 1.0);
        let ultra = ZoomLevel::new(LensKind::Ultrawide, 100.0);
        assert_eq!(order(tele, ultra), Ordering::Less);
        assert!(ultra > tele);

        let wide = ZoomLevel::new(LensKind::Wide, 0.1);
        let tele_far = ZoomLevel::new(LensKind::Telephoto, 50.0);
        assert!(wide > tele_far);
    }
}
