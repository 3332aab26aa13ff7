pub mod file;
pub mod stdin;

use serde::de::DeserializeOwned;

/// Load a typed input from `--input <file>` or, failing that, piped stdin.
pub fn load<T: DeserializeOwned>(
    path: Option<&str>,
    what: &str,
) -> Result<T, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        return file::read_input(path);
    }
    match stdin::read_stdin()? {
        Some(value) => Ok(value),
        None => Err(format!("--input <file.json|file.yaml> or stdin required for {what}").into()),
    }
}
