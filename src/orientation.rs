use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Frame orientation picked before a session starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// 2:3, story/phone framing
    Portrait,
    /// 3:2, post/web framing
    Landscape,
}

impl Orientation {
    pub const ALL: [Orientation; 2] = [Orientation::Portrait, Orientation::Landscape];

    /// Target width/height ratio requested from the camera
    pub fn aspect_ratio(&self) -> f64 {
        match self {
            Orientation::Portrait => 2.0 / 3.0,
            Orientation::Landscape => 3.0 / 2.0,
        }
    }

    /// Ratio as `(width, height)` integer parts
    pub fn ratio_parts(&self) -> (u32, u32) {
        match self {
            Orientation::Portrait => (2, 3),
            Orientation::Landscape => (3, 2),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Portrait => "portrait",
            Orientation::Landscape => "landscape",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Orientation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "portrait" => Ok(Orientation::Portrait),
            "landscape" => Ok(Orientation::Landscape),
            other => Err(format!(
                "unknown orientation '{}', expected 'portrait' or 'landscape'",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aspect_ratios() {
        assert!((Orientation::Portrait.aspect_ratio() - 2.0 / 3.0).abs() < f64::EPSILON);
        assert!((Orientation::Landscape.aspect_ratio() - 1.5).abs() < f64::EPSILON);
        assert_eq!(Orientation::Portrait.ratio_parts(), (2, 3));
        assert_eq!(Orientation::Landscape.ratio_parts(), (3, 2));
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("Portrait".parse::<Orientation>(), Ok(Orientation::Portrait));
        assert_eq!(" LANDSCAPE ".parse::<Orientation>(), Ok(Orientation::Landscape));
        assert!("square".parse::<Orientation>().is_err());
    }

    #[test]
    fn test_display_matches_serde_name() {
        for orientation in Orientation::ALL {
            let json = serde_json::to_string(&orientation).unwrap();
            assert_eq!(json, format!("\"{}\"", orientation));
        }
    }
}
