//! Land-cover join.
//!
//! Tags fixes with the land-use class of the polygon they fall in. Layers are
//! GeoJSON feature collections, which are WGS84 by definition, so fix
//! coordinates are used as-is without reprojection.
//!
//! Polygons are indexed by bounding box in an R-tree; candidate polygons are
//! then tested exactly. A point on a polygon's boundary counts as inside. When
//! polygons overlap, the one listed first in the layer wins.

use geo::{BoundingRect, Geometry, Intersects, MultiPolygon, Point};
use geojson::{Feature, GeoJson};
use log::{debug, info, warn};
use rstar::{RTree, RTreeObject, AABB};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::{DerivedFix, GpsPoint, TrackError};

/// Count key for fixes outside every polygon.
pub const UNCLASSIFIED: &str = "unclassified";

struct LandCoverPolygon {
    class: String,
    shape: MultiPolygon<f64>,
}

/// Bounding box of one polygon, for R-tree queries
#[derive(Debug, Clone)]
struct PolygonBounds {
    idx: usize,
    min: [f64; 2],
    max: [f64; 2],
}

impl RTreeObject for PolygonBounds {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.min, self.max)
    }
}

/// A set of land-use polygons with a spatial index.
pub struct LandCoverLayer {
    polygons: Vec<LandCoverPolygon>,
    index: RTree<PolygonBounds>,
}

impl LandCoverLayer {
    /// Parse a layer from GeoJSON text. `class_property` names the feature
    /// property holding the land-use class.
    pub fn from_geojson_str(text: &str, class_property: &str) -> Result<Self, TrackError> {
        let geojson: GeoJson = text.parse()?;
        Self::from_geojson(geojson, class_property, "<inline>")
    }

    /// Read a layer from a GeoJSON file.
    pub fn from_geojson_path<P: AsRef<Path>>(path: P, class_property: &str) -> Result<Self, TrackError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let geojson = GeoJson::from_reader(BufReader::new(file))?;
        Self::from_geojson(geojson, class_property, &path.display().to_string())
    }

    fn from_geojson(geojson: GeoJson, class_property: &str, source: &str) -> Result<Self, TrackError> {
        let features: Vec<Feature> = match geojson {
            GeoJson::FeatureCollection(collection) => collection.features,
            GeoJson::Feature(feature) => vec![feature],
            GeoJson::Geometry(_) => Vec::new(),
        };

        let mut polygons = Vec::new();
        for (i, feature) in features.into_iter().enumerate() {
            let class = match feature.property(class_property) {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) | None => {
                    warn!("[landcover] feature {} has no '{}' property, skipping", i, class_property);
                    continue;
                }
                Some(other) => other.to_string(),
            };

            let Some(geometry) = feature.geometry else {
                warn!("[landcover] feature {} has no geometry, skipping", i);
                continue;
            };

            let shape = match Geometry::<f64>::try_from(geometry)? {
                Geometry::Polygon(polygon) => MultiPolygon::new(vec![polygon]),
                Geometry::MultiPolygon(multi) => multi,
                _ => {
                    debug!("[landcover] feature {} is not areal, ignoring", i);
                    continue;
                }
            };

            polygons.push(LandCoverPolygon { class, shape });
        }

        let bounds: Vec<PolygonBounds> = polygons
            .iter()
            .enumerate()
            .filter_map(|(idx, polygon)| {
                let rect = polygon.shape.bounding_rect()?;
                Some(PolygonBounds {
                    idx,
                    min: [rect.min().x, rect.min().y],
                    max: [rect.max().x, rect.max().y],
                })
            })
            .collect();

        if bounds.is_empty() {
            return Err(TrackError::EmptyLandCover(source.to_string()));
        }

        info!("[landcover] indexed {} polygons from {}", bounds.len(), source);

        Ok(Self {
            polygons,
            index: RTree::bulk_load(bounds),
        })
    }

    /// Number of indexed polygons.
    pub fn len(&self) -> usize {
        self.index.size()
    }

    pub fn is_empty(&self) -> bool {
        self.index.size() == 0
    }

    /// Land-use class at a point, if any polygon covers it.
    pub fn classify(&self, point: &GpsPoint) -> Option<&str> {
        let location = Point::new(point.longitude, point.latitude);
        let query = AABB::from_point([point.longitude, point.latitude]);

        self.index
            .locate_in_envelope_intersecting(&query)
            .filter(|bounds| self.polygons[bounds.idx].shape.intersects(&location))
            .map(|bounds| bounds.idx)
            .min()
            .map(|idx| self.polygons[idx].class.as_str())
    }

    /// Land-use class of each fix, in input order.
    pub fn join<'a, I>(&self, fixes: I) -> Vec<Option<String>>
    where
        I: IntoIterator<Item = &'a DerivedFix>,
    {
        fixes
            .into_iter()
            .map(|fix| self.classify(&fix.point()).map(str::to_string))
            .collect()
    }

    /// Number of fixes per land-use class; fixes outside every polygon are
    /// counted under [`UNCLASSIFIED`].
    pub fn class_counts<'a, I>(&self, fixes: I) -> BTreeMap<String, usize>
    where
        I: IntoIterator<Item = &'a DerivedFix>,
    {
        let mut counts = BTreeMap::new();
        for fix in fixes {
            let class = self.classify(&fix.point()).unwrap_or(UNCLASSIFIED);
            *counts.entry(class.to_string()).or_insert(0) += 1;
        }
        counts
    }
}
