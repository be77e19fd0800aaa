pub mod file;
pub mod stdin;

use serde::de::DeserializeOwned;

/// Load a command input from `--input <file>` or, failing that, from piped
/// stdin. `None` means the caller should build the input from flags.
pub fn load<T: DeserializeOwned>(path: Option<&str>) -> Result<Option<T>, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        return Ok(Some(file::read_input(path)?));
    }
    stdin::read_stdin()
}
