//! Product entity - per-SKU specification limits

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::entity::Document;
use crate::core::spc::SpecLimits;

/// Material stage a specification applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MaterialStage {
    /// Incoming coil stock, checked on the loading sheet
    Raw,
    /// Formed product, checked in the batch tests
    #[default]
    Processed,
}

impl std::fmt::Display for MaterialStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MaterialStage::Raw => write!(f, "raw"),
            MaterialStage::Processed => write!(f, "processed"),
        }
    }
}

/// Measured dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    #[default]
    Height,
    Gauge,
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dimension::Height => write!(f, "height"),
            Dimension::Gauge => write!(f, "gauge"),
        }
    }
}

/// Height and gauge specifications for one material stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterialSpecs {
    #[serde(default)]
    pub height: SpecLimits,

    #[serde(default)]
    pub gauge: SpecLimits,
}

impl MaterialSpecs {
    pub fn get(&self, dimension: Dimension) -> &SpecLimits {
        match dimension {
            Dimension::Height => &self.height,
            Dimension::Gauge => &self.gauge,
        }
    }
}

/// A product (SKU) and its specifications
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// SKU, also the document key
    pub sku: String,

    /// Nominal height of the reference block (inches). Test readings are
    /// entered as differences from this value.
    #[serde(default)]
    pub reference_block: f64,

    /// Name of the reference block used at the machine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_name: Option<String>,

    /// Incoming material specs
    #[serde(default)]
    pub raw_material: MaterialSpecs,

    /// Finished material specs
    #[serde(default)]
    pub processed_material: MaterialSpecs,

    pub created: DateTime<Utc>,
}

impl Product {
    pub fn new(sku: impl Into<String>) -> Self {
        Self {
            sku: sku.into(),
            reference_block: 0.0,
            block_name: None,
            raw_material: MaterialSpecs::default(),
            processed_material: MaterialSpecs::default(),
            created: Utc::now(),
        }
    }

    /// Specification for a stage and dimension
    pub fn spec(&self, stage: MaterialStage, dimension: Dimension) -> &SpecLimits {
        match stage {
            MaterialStage::Raw => self.raw_material.get(dimension),
            MaterialStage::Processed => self.processed_material.get(dimension),
        }
    }

    /// Processed height spec, if both limits are set
    pub fn processed_height(&self) -> Option<SpecLimits> {
        Some(self.processed_material.height).filter(SpecLimits::is_configured)
    }

    /// Convert a reading taken against the reference block into a height
    ///
    /// Returns `None` when no reference block is configured.
    pub fn actual_height(&self, difference: f64) -> Option<f64> {
        if self.reference_block == 0.0
            || !self.reference_block.is_finite()
            || !difference.is_finite()
        {
            return None;
        }
        Some(self.reference_block + difference)
    }

    /// All configured specs as (stage, dimension, limits)
    pub fn configured_specs(&self) -> Vec<(MaterialStage, Dimension, SpecLimits)> {
        let mut out = Vec::new();
        for stage in [MaterialStage::Raw, MaterialStage::Processed] {
            for dimension in [Dimension::Height, Dimension::Gauge] {
                let spec = *self.spec(stage, dimension);
                if spec.is_configured() {
                    out.push((stage, dimension, spec));
                }
            }
        }
        out
    }
}

impl Document for Product {
    const COLLECTION: &'static str = "products";
    const KIND: &'static str = "product";

    fn key(&self) -> &str {
        &self.sku
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actual_height() {
        let mut product = Product::new("SKU-1");
        assert_eq!(product.actual_height(0.001), None);

        product.reference_block = 2.38;
        let h = product.actual_height(0.0015).unwrap();
        assert!((h - 2.3815).abs() < 1e-12);
        assert_eq!(product.actual_height(f64::NAN), None);

        product.reference_block = f64::NAN;
        assert_eq!(product.actual_height(0.0015), None);
    }

    #[test]
    fn test_processed_height_requires_limits() {
        let mut product = Product::new("SKU-1");
        assert!(product.processed_height().is_none());

        product.processed_material.height = SpecLimits::new(2.385, 2.38, 2.375);
        assert!(product.processed_height().is_some());

        product.processed_material.height = SpecLimits::new(f64::NAN, 2.38, 2.375);
        assert!(product.processed_height().is_none());
    }

    #[test]
    fn test_configured_specs() {
        let mut product = Product::new("SKU-1");
        product.raw_material.gauge = SpecLimits::new(0.03, 0.028, 0.026);
        product.processed_material.height = SpecLimits::new(2.385, 2.38, 2.375);
        let specs = product.configured_specs();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].0, MaterialStage::Raw);
        assert_eq!(specs[0].1, Dimension::Gauge);
    }

    #[test]
    fn test_yaml_roundtrip_keeps_specs() {
        let mut product = Product::new("SKU-1");
        product.reference_block = 2.38;
        product.processed_material.height = SpecLimits::new(2.385, 2.38, 2.375);
        let yaml = serde_yml::to_string(&product).unwrap();
        let back: Product = serde_yml::from_str(&yaml).unwrap();
        assert_eq!(back.processed_material, product.processed_material);
        assert_eq!(back.reference_block, 2.38);
    }
}
