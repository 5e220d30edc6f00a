//! Pass data model.
//!
//! Types in this module serialize into the `pass.json` document of a bundle.
//! Optional attributes are omitted when absent, localized text is written as
//! its lookup key, and dates use [`date::PASS_DATE_FORMAT`].
//!
//! | Type | JSON |
//! |------|------|
//! | [`Pass`] | root object |
//! | [`PassStyle`] | one of `boardingPass`, `coupon`, `eventTicket`, `generic`, `storeCard` |
//! | [`PassStructure`] | `headerFields` … `backFields`, `transitType` |
//! | [`PassField`] | one entry of a field zone |
//! | [`PassLocation`] / [`PassBeacon`] | `locations` / `beacons` |
//! | [`PassSemantics`] | `semantics` |

pub mod barcode;
pub mod date;
pub mod field;
pub mod localizable;
pub mod location;
pub mod pass;
pub mod semantics;

pub use barcode::{Barcode, BarcodeFormat};
pub use field::{
    DataDetector, DateStyle, FieldValue, FieldZone, NumberStyle, PassField, PassStructure,
    TextAlignment, TransitType,
};
pub use localizable::{merge_tables, Localizable, LocalizableString, StringTable};
pub use location::{PassBeacon, PassLocation};
pub use pass::{FormatVersion, Pass, PassNfc, PassStyle, WebService};
pub use semantics::{CurrencyAmount, PassSemantics, PersonNameComponents, SemanticLocation, SemanticSeat};
