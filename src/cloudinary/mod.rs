mod credentials;
mod signature;
mod upload;

pub use credentials::{CloudinaryCredentials, CredentialsError};
pub use signature::CloudinarySigner;
pub use upload::CloudinaryClient;
