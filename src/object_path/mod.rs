pub use self::object_path::ObjectPath;
mod object_path;

pub use self::object_path_error::ObjectPathError;
mod object_path_error;

#[cfg(test)]
mod tests;
