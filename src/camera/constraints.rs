use crate::config::FacingMode;
use crate::orientation::Orientation;

/// What a session asks of the camera when opening a stream
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamConstraints {
    pub facing: FacingMode,
    /// Requested width / height
    pub aspect_ratio: f64,
    /// Preferred width; treated as an upper bound when negotiating
    pub ideal_width: u32,
}

impl StreamConstraints {
    pub fn for_orientation(orientation: Orientation, ideal_width: u32, facing: FacingMode) -> Self {
        Self {
            facing,
            aspect_ratio: orientation.aspect_ratio(),
            ideal_width,
        }
    }

    /// Largest centered region of `sensor` with the requested aspect ratio,
    /// as `(x, y, width, height)`.
    pub fn crop_region(&self, sensor: (u32, u32)) -> Option<(u32, u32, u32, u32)> {
        let (sensor_width, sensor_height) = sensor;
        if sensor_width == 0 || sensor_height == 0 || self.aspect_ratio <= 0.0 {
            return None;
        }

        let sensor_ratio = sensor_width as f64 / sensor_height as f64;
        let (width, height) = if sensor_ratio > self.aspect_ratio {
            let width = (sensor_height as f64 * self.aspect_ratio).round() as u32;
            (width.min(sensor_width), sensor_height)
        } else {
            let height = (sensor_width as f64 / self.aspect_ratio).round() as u32;
            (sensor_width, height.min(sensor_height))
        };

        if width == 0 || height == 0 {
            return None;
        }

        Some((
            (sensor_width - width) / 2,
            (sensor_height - height) / 2,
            width,
            height,
        ))
    }

    /// Resolution a sensor of the given size delivers under these constraints
    pub fn negotiate(&self, sensor: (u32, u32)) -> Option<(u32, u32)> {
        let (_, _, mut width, mut height) = self.crop_region(sensor)?;

        if self.ideal_width > 0 && width > self.ideal_width {
            width = self.ideal_width;
            height = (width as f64 / self.aspect_ratio).round() as u32;
        }

        if width == 0 || height == 0 {
            None
        } else {
            Some((width, height))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negotiate_from_landscape_sensor() {
        let portrait =
            StreamConstraints::for_orientation(Orientation::Portrait, 1920, FacingMode::User);
        let landscape =
            StreamConstraints::for_orientation(Orientation::Landscape, 1920, FacingMode::User);

        assert_eq!(portrait.negotiate((1920, 1080)), Some((720, 1080)));
        assert_eq!(landscape.negotiate((1920, 1080)), Some((1620, 1080)));
    }

    #[test]
    fn test_negotiate_caps_at_ideal_width() {
        let landscape =
            StreamConstraints::for_orientation(Orientation::Landscape, 960, FacingMode::User);
        assert_eq!(landscape.negotiate((3840, 2160)), Some((960, 640)));
    }

    #[test]
    fn test_crop_region_is_centered() {
        let portrait =
            StreamConstraints::for_orientation(Orientation::Portrait, 1920, FacingMode::User);
        assert_eq!(portrait.crop_region((1920, 1080)), Some((600, 0, 720, 1080)));
        assert_eq!(portrait.crop_region((0, 1080)), None);
    }
}
