//! Fully qualified gRPC method paths.
//!
//! These are the request paths tonic routes on (`/<package>.<Service>/<Method>`)
//! and the keys of the server's role policy. Kept here so the server policy
//! and any client-side tooling agree on the exact strings.

// ---------------------------------------------------------------------------
// LaptopService
// ---------------------------------------------------------------------------

/// `/pcbook.v1.LaptopService/CreateLaptop`
pub const METHOD_CREATE_LAPTOP: &str = "/pcbook.v1.LaptopService/CreateLaptop";

/// `/pcbook.v1.LaptopService/SearchLaptop`
pub const METHOD_SEARCH_LAPTOP: &str = "/pcbook.v1.LaptopService/SearchLaptop";

/// `/pcbook.v1.LaptopService/UploadImage`
pub const METHOD_UPLOAD_IMAGE: &str = "/pcbook.v1.LaptopService/UploadImage";

/// `/pcbook.v1.LaptopService/RateLaptop`
pub const METHOD_RATE_LAPTOP: &str = "/pcbook.v1.LaptopService/RateLaptop";

// ---------------------------------------------------------------------------
// AuthService
// ---------------------------------------------------------------------------

/// `/pcbook.v1.AuthService/Login`
pub const METHOD_LOGIN: &str = "/pcbook.v1.AuthService/Login";
