//! Transport payload codec
//!
//! Encodes a catalog payload into a compact token safe for a URL fragment:
//! canonical JSON, gzip, then URL-safe base64 with a SHA-256 integrity tag
//! computed over the pre-compression bytes. Token shape:
//!
//! ```text
//! v1.<base64url(gzip(json))>.<base64url(sha256(json))>
//! ```
//!
//! Decoding never panics on untrusted input; every failure is a typed
//! `DecodeError`, and the tag lets corruption be told apart from a payload
//! that was simply never present.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use rust_decimal::Decimal;
use sha2::{Digest as _, Sha256};
use std::collections::HashSet;
use std::io::{Read as _, Write as _};
use thiserror::Error;
use validator::Validate as _;

use crate::domain::aggregates::catalog::CatalogPayload;

const TRANSPORT_VERSION: &str = "v1";
/// Tokens beyond this are garbage, rejected before any decoding work.
const MAX_TOKEN_LEN: usize = 256 * 1024;
/// Default cap on decompressed payload size; bounds memory against
/// adversarial input.
const DEFAULT_MAX_DECOMPRESSED: usize = 4 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum DecodeError {
    /// Malformed token, base64/gzip/JSON failure, or size cap breach.
    #[error("corrupt payload: {0}")]
    CorruptPayload(String),
    /// Integrity tag did not match the decompressed bytes.
    #[error("integrity tag mismatch")]
    IntegrityMismatch,
    /// Parsed, but the data breaks a catalog invariant.
    #[error("schema violation: {0}")]
    SchemaViolation(String),
}

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("payload rejected before encode: {0}")]
    Invalid(String),
    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("compression failed: {0}")]
    Compress(#[from] std::io::Error),
}

#[derive(Clone, Debug)]
pub struct Codec {
    max_decompressed: usize,
}

impl Default for Codec {
    fn default() -> Self { Self { max_decompressed: DEFAULT_MAX_DECOMPRESSED } }
}

impl Codec {
    pub fn new() -> Self { Self::default() }

    pub fn with_max_decompressed(max_decompressed: usize) -> Self {
        Self { max_decompressed }
    }

    /// Pure transform: `decode(encode(x)) == x` for any payload that passes
    /// validation. Invalid payloads are refused so the guarantee holds.
    pub fn encode(&self, catalog: &CatalogPayload) -> Result<String, EncodeError> {
        validate_payload(catalog).map_err(|e| EncodeError::Invalid(e.to_string()))?;
        let canonical = serde_json::to_vec(catalog)?;
        let digest = Sha256::digest(&canonical);
        let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
        encoder.write_all(&canonical)?;
        let compressed = encoder.finish()?;
        Ok(format!(
            "{TRANSPORT_VERSION}.{}.{}",
            URL_SAFE_NO_PAD.encode(compressed),
            URL_SAFE_NO_PAD.encode(digest)
        ))
    }

    pub fn decode(&self, token: &str) -> Result<CatalogPayload, DecodeError> {
        if token.len() > MAX_TOKEN_LEN {
            return Err(DecodeError::CorruptPayload("token exceeds max length".into()));
        }
        let (payload_part, digest_part) = parse_parts(token)?;
        let compressed = URL_SAFE_NO_PAD
            .decode(payload_part)
            .map_err(|e| DecodeError::CorruptPayload(format!("payload base64: {e}")))?;
        let tag = URL_SAFE_NO_PAD
            .decode(digest_part)
            .map_err(|e| DecodeError::CorruptPayload(format!("digest base64: {e}")))?;

        let canonical = self.decompress(&compressed)?;
        let digest = Sha256::digest(&canonical);
        if digest.as_slice() != tag.as_slice() {
            return Err(DecodeError::IntegrityMismatch);
        }

        // Text parse failure is corruption; a shape the schema rejects is not.
        let value: serde_json::Value = serde_json::from_slice(&canonical)
            .map_err(|e| DecodeError::CorruptPayload(format!("json: {e}")))?;
        let catalog: CatalogPayload = serde_json::from_value(value)
            .map_err(|e| DecodeError::SchemaViolation(e.to_string()))?;
        validate_payload(&catalog)?;
        Ok(catalog)
    }

    fn decompress(&self, compressed: &[u8]) -> Result<Vec<u8>, DecodeError> {
        let mut out = Vec::new();
        let mut decoder = GzDecoder::new(compressed).take(self.max_decompressed as u64 + 1);
        decoder
            .read_to_end(&mut out)
            .map_err(|e| DecodeError::CorruptPayload(format!("gzip: {e}")))?;
        if out.len() > self.max_decompressed {
            return Err(DecodeError::CorruptPayload("decompressed payload exceeds size cap".into()));
        }
        Ok(out)
    }
}

/// Semantic checks shared by encode, decode, and the resolver's remote tier.
pub fn validate_payload(catalog: &CatalogPayload) -> Result<(), DecodeError> {
    catalog
        .validate()
        .map_err(|e| DecodeError::SchemaViolation(e.to_string()))?;
    if catalog.products.is_empty() && !catalog.allow_empty {
        return Err(DecodeError::SchemaViolation("product list is empty".into()));
    }
    let tolerance = Decimal::new(5, 1); // half a percentage point
    let mut seen = HashSet::new();
    for product in &catalog.products {
        if !seen.insert(product.id.as_str()) {
            return Err(DecodeError::SchemaViolation(format!("duplicate product id {}", product.id)));
        }
        if product.unit_price > product.msrp {
            return Err(DecodeError::SchemaViolation(format!(
                "product {}: unit price {} exceeds msrp {}",
                product.id, product.unit_price, product.msrp
            )));
        }
        if let Some(stated) = product.margin_percent {
            let derived = product.derived_margin();
            if (stated - derived).abs() > tolerance {
                tracing::warn!(
                    product_id = %product.id,
                    %stated,
                    %derived,
                    "stated margin disagrees with price pair"
                );
            }
        }
    }
    Ok(())
}

fn parse_parts(token: &str) -> Result<(&str, &str), DecodeError> {
    let parts: Vec<&str> = token.split('.').collect();
    match parts.as_slice() {
        [version, payload, digest] if *version == TRANSPORT_VERSION => Ok((payload, digest)),
        [version, _, _] => Err(DecodeError::CorruptPayload(format!(
            "unsupported transport version: {version}"
        ))),
        _ => Err(DecodeError::CorruptPayload("malformed token".into())),
    }
}
