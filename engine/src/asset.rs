//! # Supported Assets
//!
//! Defines the asset abstraction for the vault. Every token the pool can
//! custody -- dollar stablecoins of various vintages, and whatever
//! stable-value instrument comes next -- is represented as an [`AssetInfo`]
//! with a unique [`AssetId`].
//!
//! Asset IDs are deterministic BLAKE3 hashes of the asset's canonical
//! properties (name, symbol, decimals). The same asset always gets the same
//! ID regardless of when or where it's registered -- no registry needed, no
//! coordination required.
//!
//! A pool's supported assets live in an [`AssetSet`]: registration order is
//! preserved (it is the tie-break for withdrawal planning), entries are
//! immutable once added, and registration enforces the precision bound.

use serde::{Deserialize, Serialize};
use std::fmt;

use thiserror::Error;

use crate::config::{decimals_supported, COMMON_DECIMALS, MAX_SUPPORTED_ASSETS};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised when registering assets into an [`AssetSet`].
#[derive(Debug, Error)]
pub enum AssetError {
    /// The asset is already registered. Supported assets are immutable;
    /// re-registering is always a caller bug.
    #[error("asset {symbol} ({id}) is already registered")]
    DuplicateAsset {
        /// Content-addressed id of the duplicate.
        id: AssetId,
        /// Ticker symbol, for log readability.
        symbol: String,
    },

    /// The asset's native precision is finer than the common accounting
    /// precision. Normalization is multiply-only, so such an asset can
    /// never be priced without losing value.
    #[error(
        "asset {symbol} declares {decimals} decimals, beyond the common precision of {max}"
    )]
    UnsupportedDecimals {
        /// Ticker symbol of the offending asset.
        symbol: String,
        /// Declared native decimals.
        decimals: u8,
        /// The common accounting precision.
        max: u8,
    },

    /// The asset set is full. Valuation iterates every supported asset on
    /// every operation, so the set is deliberately bounded.
    #[error("asset set is full (capacity {capacity})")]
    RegistryFull {
        /// Maximum number of supported assets.
        capacity: usize,
    },
}

// ---------------------------------------------------------------------------
// AssetId
// ---------------------------------------------------------------------------

/// A unique, content-addressed identifier for a supported asset.
///
/// Computed as `BLAKE3(name || symbol || decimals)`. Two assets with
/// identical properties will always produce the same ID, making this a
/// natural deduplication key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetId([u8; 32]);

impl AssetId {
    /// Creates an `AssetId` from a raw 32-byte hash.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the raw 32-byte identifier.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Returns the hex-encoded asset ID.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parses a hex-encoded asset ID.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// Derives an `AssetId` from the canonical asset properties.
    ///
    /// The hash input is the concatenation of:
    /// - `name` (UTF-8 bytes)
    /// - `0x00` separator
    /// - `symbol` (UTF-8 bytes)
    /// - `0x00` separator
    /// - `decimals` (single byte)
    ///
    /// The separator bytes prevent ambiguity when one field's suffix
    /// matches another field's prefix.
    pub fn derive(name: &str, symbol: &str, decimals: u8) -> Self {
        let mut preimage = Vec::with_capacity(name.len() + symbol.len() + 3);
        preimage.extend_from_slice(name.as_bytes());
        preimage.push(0x00);
        preimage.extend_from_slice(symbol.as_bytes());
        preimage.push(0x00);
        preimage.push(decimals);

        Self(*blake3::hash(&preimage).as_bytes())
    }
}

impl fmt::Debug for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssetId({}...)", &self.to_hex()[..12])
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl std::str::FromStr for AssetId {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

// ---------------------------------------------------------------------------
// Serde helper: serialize HashMap<AssetId, V> with hex-string keys
// ---------------------------------------------------------------------------

/// Serde helper module for serializing/deserializing `HashMap<AssetId, V>`
/// as a JSON object with hex-encoded string keys.
///
/// JSON requires map keys to be strings, but `AssetId` wraps `[u8; 32]`
/// which serde would serialize as an array. This module converts keys
/// to/from their hex representation so the map serializes correctly.
///
/// # Usage
///
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct MyStruct {
///     #[serde(with = "basin_engine::asset::asset_id_map")]
///     holdings: HashMap<AssetId, u128>,
/// }
/// ```
pub mod asset_id_map {
    use super::AssetId;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::HashMap;

    pub fn serialize<V, S>(map: &HashMap<AssetId, V>, serializer: S) -> Result<S::Ok, S::Error>
    where
        V: Serialize,
        S: Serializer,
    {
        use serde::ser::SerializeMap;
        let mut ser_map = serializer.serialize_map(Some(map.len()))?;
        for (key, value) in map {
            ser_map.serialize_entry(&key.to_hex(), value)?;
        }
        ser_map.end()
    }

    pub fn deserialize<'de, V, D>(deserializer: D) -> Result<HashMap<AssetId, V>, D::Error>
    where
        V: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        let string_map: HashMap<String, V> = HashMap::deserialize(deserializer)?;
        string_map
            .into_iter()
            .map(|(key, value)| {
                AssetId::from_hex(&key)
                    .map(|id| (id, value))
                    .map_err(serde::de::Error::custom)
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// AssetInfo
// ---------------------------------------------------------------------------

/// Complete metadata for a supported asset.
///
/// This is the canonical record the pool keeps for each asset it custodies.
/// Immutable once registered into an [`AssetSet`] -- in particular the
/// declared `decimals` can never change, because every historical share
/// price depends on it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetInfo {
    /// Content-addressed identifier derived from this asset's properties.
    pub id: AssetId,

    /// Human-readable asset name (e.g., "Dai Stablecoin").
    pub name: String,

    /// Trading symbol / ticker (e.g., "DAI").
    pub symbol: String,

    /// Number of decimal places in the asset's native smallest unit.
    ///
    /// An asset with `decimals = 6` and raw amount `1_500_000` represents
    /// 1.5 whole units. Valuation scales this up to [`COMMON_DECIMALS`]
    /// before any share math.
    pub decimals: u8,
}

/// Factory for creating [`AssetInfo`] instances with derived IDs.
///
/// This is the only correct way to create an asset -- it ensures the ID is
/// always consistent with the asset's properties.
pub struct Asset;

impl Asset {
    /// Creates a new [`AssetInfo`] with a deterministically derived
    /// [`AssetId`].
    ///
    /// # Arguments
    ///
    /// * `name` -- Human-readable name (e.g., "Dai Stablecoin")
    /// * `symbol` -- Ticker symbol (e.g., "DAI")
    /// * `decimals` -- Native decimal places (e.g., 18 for DAI, 6 for USDC)
    pub fn new(name: &str, symbol: &str, decimals: u8) -> AssetInfo {
        AssetInfo {
            id: AssetId::derive(name, symbol, decimals),
            name: name.to_string(),
            symbol: symbol.to_string(),
            decimals,
        }
    }
}

// ---------------------------------------------------------------------------
// AssetSet
// ---------------------------------------------------------------------------

/// The ordered set of assets a pool supports.
///
/// Registration order is significant: it is the deterministic tie-break
/// when withdrawal planning ranks assets with equal idle value. Entries are
/// append-only and unique by [`AssetId`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AssetSet {
    assets: Vec<AssetInfo>,
}

impl AssetSet {
    /// Creates an empty asset set.
    pub fn new() -> Self {
        Self { assets: Vec::new() }
    }

    /// Registers an asset, preserving insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::DuplicateAsset`] if the id is already present,
    /// [`AssetError::UnsupportedDecimals`] if the asset is finer-grained
    /// than the common accounting precision, and
    /// [`AssetError::RegistryFull`] at capacity.
    pub fn register(&mut self, asset: AssetInfo) -> Result<(), AssetError> {
        if !decimals_supported(asset.decimals) {
            return Err(AssetError::UnsupportedDecimals {
                symbol: asset.symbol,
                decimals: asset.decimals,
                max: COMMON_DECIMALS,
            });
        }
        if self.assets.len() >= MAX_SUPPORTED_ASSETS {
            return Err(AssetError::RegistryFull {
                capacity: MAX_SUPPORTED_ASSETS,
            });
        }
        if self.contains(&asset.id) {
            return Err(AssetError::DuplicateAsset {
                id: asset.id,
                symbol: asset.symbol,
            });
        }
        self.assets.push(asset);
        Ok(())
    }

    /// Returns `true` if the asset id is registered.
    pub fn contains(&self, id: &AssetId) -> bool {
        self.assets.iter().any(|a| &a.id == id)
    }

    /// Looks up a registered asset by id.
    pub fn get(&self, id: &AssetId) -> Option<&AssetInfo> {
        self.assets.iter().find(|a| &a.id == id)
    }

    /// Iterates assets in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &AssetInfo> {
        self.assets.iter()
    }

    /// Number of registered assets.
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Returns `true` if no assets are registered.
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Pre-defined Asset Constants
// ---------------------------------------------------------------------------

/// Dai -- the 18-decimal workhorse stablecoin.
pub fn dai() -> AssetInfo {
    Asset::new("Dai Stablecoin", "DAI", 18)
}

/// USD Coin -- 6 decimals, matching the native deployment.
pub fn usdc() -> AssetInfo {
    Asset::new("USD Coin", "USDC", 6)
}

/// Tether -- 6 decimals.
pub fn usdt() -> AssetInfo {
    Asset::new("Tether USD", "USDT", 6)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_id_derivation_is_deterministic() {
        let id1 = AssetId::derive("Test", "TST", 6);
        let id2 = AssetId::derive("Test", "TST", 6);
        assert_eq!(id1, id2);
    }

    #[test]
    fn different_names_produce_different_ids() {
        let id1 = AssetId::derive("Asset A", "A", 6);
        let id2 = AssetId::derive("Asset B", "B", 6);
        assert_ne!(id1, id2);
    }

    #[test]
    fn different_decimals_produce_different_ids() {
        let id1 = AssetId::derive("Dollar", "USD", 6);
        let id2 = AssetId::derive("Dollar", "USD", 18);
        assert_ne!(id1, id2);
    }

    #[test]
    fn asset_id_hex_roundtrip() {
        let id = AssetId::derive("Test", "TST", 6);
        let hex_str = id.to_hex();
        let recovered = AssetId::from_hex(&hex_str).unwrap();
        assert_eq!(id, recovered);
    }

    #[test]
    fn asset_factory_derives_consistent_id() {
        let asset = Asset::new("Test Asset", "TST", 8);
        assert_eq!(asset.id, AssetId::derive("Test Asset", "TST", 8));
        assert_eq!(asset.symbol, "TST");
        assert_eq!(asset.decimals, 8);
    }

    #[test]
    fn predefined_assets_have_expected_precision() {
        assert_eq!(dai().decimals, 18);
        assert_eq!(usdc().decimals, 6);
        assert_eq!(usdt().decimals, 6);
        assert_ne!(usdc().id, usdt().id);
    }

    #[test]
    fn register_preserves_order() {
        let mut set = AssetSet::new();
        set.register(dai()).unwrap();
        set.register(usdc()).unwrap();
        set.register(usdt()).unwrap();

        let symbols: Vec<&str> = set.iter().map(|a| a.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["DAI", "USDC", "USDT"]);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn register_rejects_duplicates() {
        let mut set = AssetSet::new();
        set.register(dai()).unwrap();
        let result = set.register(dai());
        assert!(matches!(
            result.unwrap_err(),
            AssetError::DuplicateAsset { .. }
        ));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn register_rejects_excess_precision() {
        let mut set = AssetSet::new();
        let too_fine = Asset::new("Overly Precise", "OPS", 24);
        let result = set.register(too_fine);
        assert!(matches!(
            result.unwrap_err(),
            AssetError::UnsupportedDecimals { decimals: 24, .. }
        ));
        assert!(set.is_empty());
    }

    #[test]
    fn register_rejects_when_full() {
        let mut set = AssetSet::new();
        for i in 0..MAX_SUPPORTED_ASSETS {
            let asset = Asset::new(&format!("Asset {}", i), &format!("A{}", i), 6);
            set.register(asset).unwrap();
        }
        let overflow = Asset::new("One Too Many", "OTM", 6);
        assert!(matches!(
            set.register(overflow).unwrap_err(),
            AssetError::RegistryFull { .. }
        ));
    }

    #[test]
    fn lookup_by_id() {
        let mut set = AssetSet::new();
        set.register(dai()).unwrap();
        set.register(usdc()).unwrap();

        assert!(set.contains(&dai().id));
        assert_eq!(set.get(&usdc().id).unwrap().symbol, "USDC");
        assert!(set.get(&usdt().id).is_none());
    }

    #[test]
    fn asset_info_serialization_roundtrip() {
        let asset = dai();
        let json = serde_json::to_string(&asset).expect("serialize");
        let recovered: AssetInfo = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(asset, recovered);
    }
}
