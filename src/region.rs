use serde::Deserialize;

/// Geographic bounding box in degrees. Longitudes follow the ERA5 0-360
/// convention but negative (Greenwich-centred) values are accepted too.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Region {
    pub west: f64,
    pub east: f64,
    pub south: f64,
    pub north: f64,
}

impl Region {
    pub fn new(west: f64, east: f64, south: f64, north: f64) -> Result<Self, String> {
        if !(-180.0..=360.0).contains(&west) || !(-180.0..=360.0).contains(&east) {
            return Err("Longitude values must be between -180 and 360".to_string());
        }

        if !(-90.0..=90.0).contains(&south) || !(-90.0..=90.0).contains(&north) {
            return Err("Latitude values must be between -90 and 90".to_string());
        }

        if west >= east {
            return Err("west must be strictly less than east".to_string());
        }

        if south >= north {
            return Err("south must be strictly less than north".to_string());
        }

        Ok(Region {
            west,
            east,
            south,
            north,
        })
    }

    /// Bounds of the Amundsen Sea sector used for the ASL bounding box.
    pub fn amundsen_sea() -> Self {
        Region {
            west: 170.0,
            east: 298.0,
            south: -80.0,
            north: -60.0,
        }
    }

    /// Same box widened by `border` degrees on every side. Latitudes are
    /// clamped to the poles; longitudes are left unclamped since the data
    /// grid slicing tolerates out-of-range bounds.
    pub fn with_border(&self, border: f64) -> Self {
        Region {
            west: self.west - border,
            east: self.east + border,
            south: (self.south - border).max(-90.0),
            north: (self.north + border).min(90.0),
        }
    }

    /// Strictly-inside test: points on the boundary are excluded.
    pub fn contains_strict(&self, lon: f64, lat: f64) -> bool {
        lon > self.west && lon < self.east && lat > self.south && lat < self.north
    }
}

#[cfg(test)]
mod tests {
    use super::Region;

    #[test]
    fn test_region_coords_are_within_ranges() {
        // Amundsen Sea bounds use 0-360 longitudes
        let valid_region = Region::new(170.0, 298.0, -80.0, -60.0);
        assert!(valid_region.is_ok());

        // Greenwich-centred longitudes are also valid
        let valid_region2 = Region::new(-67.2, -58.7, 70.9, 73.3);
        assert!(valid_region2.is_ok());

        // Test longitude out of range
        let invalid_lon = Region::new(-200.0, 0.0, 0.0, 10.0);
        assert!(invalid_lon.is_err());

        let invalid_lon2 = Region::new(0.0, 400.0, 0.0, 10.0);
        assert!(invalid_lon2.is_err());

        // Test latitude out of range
        let invalid_lat = Region::new(0.0, 10.0, -100.0, 0.0);
        assert!(invalid_lat.is_err());

        let invalid_lat2 = Region::new(0.0, 10.0, 0.0, 100.0);
        assert!(invalid_lat2.is_err());

        // Degenerate and inverted boxes are rejected
        let invalid_order_lon = Region::new(10.0, 10.0, 0.0, 10.0);
        assert!(invalid_order_lon.is_err());

        let invalid_order_lat = Region::new(0.0, 10.0, 10.0, 0.0);
        assert!(invalid_order_lat.is_err());
    }

    #[test]
    fn test_with_border() {
        let region = Region::amundsen_sea().with_border(8.0);

        assert_eq!(region.west, 162.0);
        assert_eq!(region.east, 306.0);
        assert_eq!(region.south, -88.0);
        assert_eq!(region.north, -52.0);

        // Latitudes clamp at the pole
        let polar = Region::new(0.0, 10.0, -85.0, -60.0).unwrap().with_border(8.0);
        assert_eq!(polar.south, -90.0);
    }

    #[test]
    fn test_contains_is_strict_on_boundaries() {
        let region = Region::amundsen_sea();

        assert!(region.contains_strict(200.0, -70.0));

        // Points exactly on any edge are excluded
        assert!(!region.contains_strict(region.west, -70.0));
        assert!(!region.contains_strict(region.east, -70.0));
        assert!(!region.contains_strict(200.0, region.south));
        assert!(!region.contains_strict(200.0, region.north));

        // Just inside the western edge is included
        assert!(region.contains_strict(region.west + 1e-6, -70.0));
    }
}
