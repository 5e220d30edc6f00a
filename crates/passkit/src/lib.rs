pub mod archive;
pub mod bundle;
pub mod crypto;
pub mod error;
pub mod generator;
pub mod model;
pub mod process;

pub use archive::PassArchive;
pub use bundle::Manifest;
pub use error::Error;
pub use generator::{PassGenerator, PassGeneratorBuilder};
pub use model::{
    Barcode, BarcodeFormat, FieldValue, LocalizableString, Pass, PassBeacon, PassField,
    PassLocation, PassNfc, PassSemantics, PassStructure, PassStyle, PersonNameComponents,
    TransitType, WebService,
};

pub type Result<T> = std::result::Result<T, Error>;
