//! Category tables for the one-hot blocks of the feature vector.
//!
//! The declaration order of [`Town`] and [`FlatType`] is the column order the
//! trained model was fit on. Reordering, renaming or inserting a variant
//! silently changes every prediction, so the tests below pin both tables
//! literal by literal.

use std::str::FromStr;

use strum::{AsRefStr, Display, EnumString, VariantArray};

use crate::error::PredictError;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display, EnumString, VariantArray,
)]
pub enum Town {
    #[strum(serialize = "ANG MO KIO")]
    AngMoKio,
    #[strum(serialize = "BEDOK")]
    Bedok,
    #[strum(serialize = "BISHAN")]
    Bishan,
    #[strum(serialize = "BUKIT BATOK")]
    BukitBatok,
    #[strum(serialize = "BUKIT MERAH")]
    BukitMerah,
    #[strum(serialize = "BUKIT PANJANG")]
    BukitPanjang,
    #[strum(serialize = "BUKIT TIMAH")]
    BukitTimah,
    #[strum(serialize = "CENTRAL AREA")]
    CentralArea,
    #[strum(serialize = "CHOA CHU KANG")]
    ChoaChuKang,
    #[strum(serialize = "CLEMENTI")]
    Clementi,
    #[strum(serialize = "GEYLANG")]
    Geylang,
    #[strum(serialize = "HOUGANG")]
    Hougang,
    #[strum(serialize = "JURONG EAST")]
    JurongEast,
    #[strum(serialize = "JURONG WEST")]
    JurongWest,
    #[strum(serialize = "KALLANG/WHAMPOA")]
    KallangWhampoa,
    #[strum(serialize = "MARINE PARADE")]
    MarineParade,
    #[strum(serialize = "PASIR RIS")]
    PasirRis,
    #[strum(serialize = "PUNGGOL")]
    Punggol,
    #[strum(serialize = "QUEENSTOWN")]
    Queenstown,
    #[strum(serialize = "SEMBAWANG")]
    Sembawang,
    #[strum(serialize = "SENGKANG")]
    Sengkang,
    #[strum(serialize = "SERANGOON")]
    Serangoon,
    #[strum(serialize = "TAMPINES")]
    Tampines,
    #[strum(serialize = "TOA PAYOH")]
    ToaPayoh,
    #[strum(serialize = "WOODLANDS")]
    Woodlands,
    #[strum(serialize = "YISHUN")]
    Yishun,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display, EnumString, VariantArray,
)]
pub enum FlatType {
    #[strum(serialize = "3 ROOM")]
    ThreeRoom,
    #[strum(serialize = "4 ROOM")]
    FourRoom,
    #[strum(serialize = "5 ROOM")]
    FiveRoom,
    #[strum(serialize = "EXECUTIVE")]
    Executive,
    #[strum(serialize = "MULTI-GENERATION")]
    MultiGeneration,
}

impl Town {
    /// Zero-based index of this town inside the town one-hot block.
    pub fn position(self) -> usize {
        self as usize
    }

    /// Exact, case-sensitive lookup by the literal the model was trained on.
    pub fn parse(value: &str) -> Result<Self, PredictError> {
        Town::from_str(value).map_err(|_| PredictError::InvalidCategory {
            field: "town",
            value: value.to_string(),
        })
    }
}

impl FlatType {
    /// Zero-based index of this flat type inside the flat-type one-hot block.
    pub fn position(self) -> usize {
        self as usize
    }

    pub fn parse(value: &str) -> Result<Self, PredictError> {
        FlatType::from_str(value).map_err(|_| PredictError::InvalidCategory {
            field: "flat_type",
            value: value.to_string(),
        })
    }
}

/// Town literals in one-hot order.
pub fn town_names() -> Vec<&'static str> {
    Town::VARIANTS.iter().map(|town| town.as_ref()).collect()
}

/// Flat type literals in one-hot order.
pub fn flat_type_names() -> Vec<&'static str> {
    FlatType::VARIANTS.iter().map(|flat| flat.as_ref()).collect()
}
