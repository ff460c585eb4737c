pub use self::signature::Signature;
mod signature;

pub use self::signature_error::SignatureError;
mod signature_error;

#[cfg(test)]
mod tests;
