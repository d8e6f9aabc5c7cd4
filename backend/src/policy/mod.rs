//! Upload policy: filename sanitization, extension deny list and request
//! validation

mod extension;
mod filename;
mod object_name;
mod upload;

pub use extension::{extension_of, is_extension_allowed, DENIED_EXTENSIONS};
pub use filename::{sanitize_filename, FilenameRejection, MAX_FILENAME_CHARS};
pub use object_name::ObjectNameMinter;
pub use upload::{
    validate_upload, ExpirationDays, UploadValidationError, ValidatedUpload,
    MAX_EXPIRATION_DAYS, MAX_FILE_SIZE_BYTES, MIN_EXPIRATION_DAYS,
};
