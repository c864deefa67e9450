//! # Variant Matching
//!
//! Two lines are the same variant when product, color and model are all
//! equal. Unset color/model compare as the empty string, so "no model" on a
//! request matches "no model" on a stored line.
//!
//! Display fields (title, image, slug) never take part in identity.

use std::fmt;

use crate::types::{CartLine, CartLineRequest};

/// Identity of a purchasable variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VariantKey<'a> {
    pub product_id: &'a str,
    pub color: &'a str,
    pub model: &'a str,
}

impl<'a> VariantKey<'a> {
    pub fn new(product_id: &'a str, color: &'a str, model: &'a str) -> Self {
        VariantKey {
            product_id,
            color,
            model,
        }
    }

    /// Checks whether `line` is this variant.
    #[inline]
    pub fn matches(&self, line: &CartLine) -> bool {
        line.product_id == self.product_id && line.color == self.color && line.model == self.model
    }
}

impl fmt::Display for VariantKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.product_id)?;
        if !self.color.is_empty() {
            write!(f, "/{}", self.color)?;
        }
        if !self.model.is_empty() {
            write!(f, "/{}", self.model)?;
        }
        Ok(())
    }
}

impl CartLine {
    /// Returns this line's variant key.
    pub fn variant_key(&self) -> VariantKey<'_> {
        VariantKey::new(&self.product_id, &self.color, &self.model)
    }
}

impl CartLineRequest {
    /// Returns the variant key this request targets.
    pub fn variant_key(&self) -> VariantKey<'_> {
        VariantKey::new(&self.product_id, self.color_str(), self.model_str())
    }
}

/// Finds the position of the line matching `key`.
pub fn find_variant(lines: &[CartLine], key: &VariantKey<'_>) -> Option<usize> {
    lines.iter().position(|line| key.matches(line))
}

/// Finds the position of the line with `line_id`.
pub fn find_line(lines: &[CartLine], line_id: &str) -> Option<usize> {
    lines.iter().position(|line| line.id == line_id)
}
