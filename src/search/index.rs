//! Exact nearest-neighbour index
//!
//! Flat storage, brute-force scan. Collections are small and rebuilt in
//! batch, so an exact scan keeps results deterministic and reproducible
//! after a reload.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Squared Euclidean distance
    L2,
    /// Negated dot product, so smaller is still closer
    InnerProduct,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::L2 => "l2",
            Self::InnerProduct => "inner_product",
        }
    }

    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Self::L2 => a
                .iter()
                .zip(b)
                .map(|(x, y)| {
                    let d = x - y;
                    d * d
                })
                .sum(),
            Self::InnerProduct => -a.iter().zip(b).map(|(x, y)| x * y).sum::<f32>(),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "l2" => Ok(Self::L2),
            "inner_product" => Ok(Self::InnerProduct),
            other => Err(format!("unknown metric '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IndexError {
    #[error("no vectors to index")]
    Empty,
    #[error("vector dimension {actual} does not match index dimension {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("vector blob of {len} bytes does not hold {rows} rows of dimension {dimension}")]
    BadBlob {
        len: usize,
        rows: usize,
        dimension: usize,
    },
}

/// One query hit: index row and its distance to the query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Neighbor {
    pub row: usize,
    pub distance: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VectorIndex {
    dimension: usize,
    metric: Metric,
    /// Row-major, `len() * dimension` values
    data: Vec<f32>,
}

impl VectorIndex {
    /// Build from scratch; row `i` is `vectors[i]`.
    pub fn build(vectors: &[Vec<f32>], metric: Metric) -> Result<Self, IndexError> {
        let first = vectors.first().ok_or(IndexError::Empty)?;
        let dimension = first.len();
        if dimension == 0 {
            return Err(IndexError::DimensionMismatch {
                expected: 1,
                actual: 0,
            });
        }

        let mut data = Vec::with_capacity(vectors.len() * dimension);
        for vector in vectors {
            if vector.len() != dimension {
                return Err(IndexError::DimensionMismatch {
                    expected: dimension,
                    actual: vector.len(),
                });
            }
            data.extend_from_slice(vector);
        }

        Ok(Self {
            dimension,
            metric,
            data,
        })
    }

    /// Top-`k` rows by ascending distance; equal distances keep row order.
    pub fn query(&self, vector: &[f32], k: usize) -> Result<Vec<Neighbor>, IndexError> {
        if vector.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }

        let mut hits: Vec<Neighbor> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(row, stored)| Neighbor {
                row,
                distance: self.metric.distance(vector, stored),
            })
            .collect();

        // NaN (overflowed products) sorts after every real distance
        hits.sort_by(|a, b| {
            a.distance
                .is_nan()
                .cmp(&b.distance.is_nan())
                .then_with(|| a.distance.total_cmp(&b.distance))
                .then(a.row.cmp(&b.row))
        });
        hits.truncate(k);

        Ok(hits)
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn len(&self) -> usize {
        self.data.len() / self.dimension
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Little-endian f32 blob of every row.
    pub fn to_blob(&self) -> Vec<u8> {
        let mut blob = Vec::with_capacity(self.data.len() * 4);
        for &val in &self.data {
            blob.extend_from_slice(&val.to_le_bytes());
        }
        blob
    }

    pub fn from_blob(
        blob: &[u8],
        rows: usize,
        dimension: usize,
        metric: Metric,
    ) -> Result<Self, IndexError> {
        if rows == 0 || dimension == 0 || blob.len() != rows * dimension * 4 {
            return Err(IndexError::BadBlob {
                len: blob.len(),
                rows,
                dimension,
            });
        }

        let data = blob
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();

        Ok(Self {
            dimension,
            metric,
            data,
        })
    }
}
