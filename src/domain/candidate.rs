use serde::{Deserialize, Serialize};

/// Which extraction path produced a candidate's price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceSource {
    /// Read from a dedicated price-styled element
    Element,
    /// Largest plausible number found anywhere in the card text
    Fallback,
}

impl PriceSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceSource::Element => "element",
            PriceSource::Fallback => "fallback",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "element" => Some(PriceSource::Element),
            "fallback" => Some(PriceSource::Fallback),
            _ => None,
        }
    }
}

/// A product card that passed the acceptance filter.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCandidate {
    pub name: String,
    pub brand: String,
    pub price: i64,
    pub price_source: PriceSource,
    pub image_url: String,
}

/// Why a scanned node was dropped. Counted, never raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMiss {
    MissingName,
    MissingPrice,
    MissingImage,
    PlaceholderImage,
}

impl std::fmt::Display for ExtractionMiss {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            ExtractionMiss::MissingName => "no name",
            ExtractionMiss::MissingPrice => "no positive price",
            ExtractionMiss::MissingImage => "no image url",
            ExtractionMiss::PlaceholderImage => "placeholder image",
        };
        f.write_str(reason)
    }
}
