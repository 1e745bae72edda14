use gdal::errors::GdalError;
use gdal::spatial_ref::{AxisMappingStrategy, SpatialRef};
use std::fmt;
use std::str::FromStr;

/// Coordinate reference system identified by its EPSG code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crs(u32);

impl Crs {
    /// Geographic CRS used by scene footprints.
    pub const WGS84: Crs = Crs(4326);

    pub fn epsg(code: u32) -> Self {
        Crs(code)
    }

    pub fn code(&self) -> u32 {
        self.0
    }

    /// Builds the GDAL spatial reference, pinned to x=easting / y=northing
    /// axis order so coordinates line up with the geotransform convention.
    pub fn to_spatial_ref(&self) -> Result<SpatialRef, GdalError> {
        let mut spatial_ref = SpatialRef::from_epsg(self.0)?;
        spatial_ref.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);
        Ok(spatial_ref)
    }
}

/// Parses a WKT projection string with the same axis order pinning as
/// [`Crs::to_spatial_ref`].
pub fn spatial_ref_from_wkt(wkt: &str) -> Result<SpatialRef, GdalError> {
    let mut spatial_ref = SpatialRef::from_wkt(wkt)?;
    spatial_ref.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);
    Ok(spatial_ref)
}

impl FromStr for Crs {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s
            .strip_prefix("EPSG:")
            .or_else(|| s.strip_prefix("epsg:"))
            .ok_or_else(|| format!("Expected an 'EPSG:<code>' identifier, got '{}'", s))?;

        code.parse::<u32>()
            .map(Crs)
            .map_err(|_| format!("Invalid EPSG code in '{}'", s))
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_epsg_identifier() {
        let crs: Crs = "EPSG:27700".parse().unwrap();
        assert_eq!(crs.code(), 27700);

        let lowercase: Crs = "epsg:4326".parse().unwrap();
        assert_eq!(lowercase, Crs::WGS84);
    }

    #[test]
    fn test_parse_rejects_malformed_identifiers() {
        assert!("27700".parse::<Crs>().is_err());
        assert!("EPSG:".parse::<Crs>().is_err());
        assert!("EPSG:abc".parse::<Crs>().is_err());
        assert!("UTM:30N".parse::<Crs>().is_err());
    }

    #[test]
    fn test_display_roundtrip() {
        let crs = Crs::epsg(27700);
        assert_eq!(crs.to_string(), "EPSG:27700");
        assert_eq!(crs.to_string().parse::<Crs>().unwrap(), crs);
    }

    #[test]
    fn test_spatial_ref_resolves_known_code() {
        let spatial_ref = Crs::epsg(27700).to_spatial_ref().unwrap();
        assert!(spatial_ref.is_projected());
    }
}
