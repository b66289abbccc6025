// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/thermalert-rs

//! Spatial clustering of flagged pixels

use serde::{Deserialize, Serialize};

use super::{BoundingBox, Point};

/// One pixel flagged by a detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlaggedPoint {
    /// Column coordinate
    pub x: usize,
    /// Row coordinate
    pub y: usize,
    /// Temperature at the pixel (°C)
    pub temperature: f64,
}

/// A spatial grouping of flagged pixels believed to represent one physical
/// phenomenon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cluster {
    /// Member pixels, in absorption order (seed first)
    pub points: Vec<FlaggedPoint>,
    /// Mean x / mean y of the members
    pub centroid: Point,
    /// Bounding box over the members
    pub bounding_box: BoundingBox,
    /// Coldest member temperature
    pub min_temp: f64,
    /// Hottest member temperature
    pub max_temp: f64,
    /// Mean member temperature
    pub mean_temp: f64,
}

impl Cluster {
    /// Number of member pixels.
    pub fn pixel_count(&self) -> usize {
        self.points.len()
    }
}

/// Groups flagged pixels into clusters by pixel distance.
///
/// Grouping is a single greedy pass: each unvisited point seeds a cluster and
/// absorbs every later unvisited point within `radius` of the *seed*. Members
/// are not expanded recursively, so an elongated chain of pixels splits into
/// several clusters rather than one. This matches the behavior thermal review
/// tooling downstream expects; true transitive closure would merge chains.
#[derive(Debug, Clone, Copy)]
pub struct SpatialClusterer {
    radius: f64,
}

impl SpatialClusterer {
    /// Clusterer with the given absorption radius in pixels.
    pub fn new(radius: f64) -> Self {
        Self {
            radius: radius.max(0.0),
        }
    }

    /// Absorption radius in pixels.
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Partition `points` into clusters. Cluster order follows seed discovery
    /// order; no other ordering is guaranteed.
    pub fn cluster(&self, points: &[FlaggedPoint]) -> Vec<Cluster> {
        let mut clusters = Vec::new();
        let mut visited = vec![false; points.len()];

        for seed_idx in 0..points.len() {
            if visited[seed_idx] {
                continue;
            }
            visited[seed_idx] = true;

            let seed = points[seed_idx];
            let mut members = vec![seed];

            for (other_idx, other) in points.iter().enumerate().skip(seed_idx + 1) {
                if visited[other_idx] {
                    continue;
                }
                if Self::distance(&seed, other) <= self.radius {
                    visited[other_idx] = true;
                    members.push(*other);
                }
            }

            clusters.push(Self::aggregate(members));
        }

        clusters
    }

    fn distance(a: &FlaggedPoint, b: &FlaggedPoint) -> f64 {
        let dx = a.x as f64 - b.x as f64;
        let dy = a.y as f64 - b.y as f64;
        (dx * dx + dy * dy).sqrt()
    }

    fn aggregate(points: Vec<FlaggedPoint>) -> Cluster {
        let n = points.len() as f64;
        let mut sum_x = 0.0;
        let mut sum_y = 0.0;
        let mut sum_t = 0.0;
        let mut min_temp = f64::MAX;
        let mut max_temp = f64::MIN;
        let mut bbox = BoundingBox {
            min_x: usize::MAX,
            min_y: usize::MAX,
            max_x: 0,
            max_y: 0,
        };

        for p in &points {
            sum_x += p.x as f64;
            sum_y += p.y as f64;
            sum_t += p.temperature;
            min_temp = min_temp.min(p.temperature);
            max_temp = max_temp.max(p.temperature);
            bbox.min_x = bbox.min_x.min(p.x);
            bbox.min_y = bbox.min_y.min(p.y);
            bbox.max_x = bbox.max_x.max(p.x);
            bbox.max_y = bbox.max_y.max(p.y);
        }

        Cluster {
            centroid: Point {
                x: sum_x / n,
                y: sum_y / n,
            },
            bounding_box: bbox,
            min_temp,
            max_temp,
            mean_temp: sum_t / n,
            points,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: usize, y: usize, t: f64) -> FlaggedPoint {
        FlaggedPoint {
            x,
            y,
            temperature: t,
        }
    }

    #[test]
    fn test_single_cluster_aggregates() {
        let clusterer = SpatialClusterer::new(3.0);
        let clusters = clusterer.cluster(&[p(1, 1, 80.0), p(2, 1, 85.0), p(2, 2, 82.0)]);

        assert_eq!(clusters.len(), 1);
        let c = &clusters[0];
        assert_eq!(c.pixel_count(), 3);
        assert!((c.centroid.x - 5.0 / 3.0).abs() < 1e-9);
        assert_eq!(c.max_temp, 85.0);
        assert_eq!(c.min_temp, 80.0);
        assert_eq!(c.bounding_box.min_x, 1);
        assert_eq!(c.bounding_box.max_y, 2);
    }

    #[test]
    fn test_distant_points_split() {
        let clusterer = SpatialClusterer::new(2.0);
        let clusters = clusterer.cluster(&[p(0, 0, 80.0), p(10, 10, 90.0)]);
        assert_eq!(clusters.len(), 2);
    }

    #[test]
    fn test_seed_only_growth() {
        // Chain 0-2-4: 2 is within radius of seed 0, 4 is not, even though
        // 4 is within radius of 2. Seed-only grouping splits the chain.
        let clusterer = SpatialClusterer::new(2.5);
        let clusters = clusterer.cluster(&[p(0, 0, 80.0), p(2, 0, 81.0), p(4, 0, 82.0)]);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].pixel_count(), 2);
        assert_eq!(clusters[1].pixel_count(), 1);
    }

    #[test]
    fn test_empty_input() {
        let clusterer = SpatialClusterer::new(2.0);
        assert!(clusterer.cluster(&[]).is_empty());
    }
}
